use core::fmt::Write;

use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::driver::EndpointError;
use monitor_core::console::ConsoleLine;

use super::{CONSOLE, USB_STORAGE};
use crate::usb::{self, ConsolePort, UsbDeviceStrings};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let (mut device, port) = usb::build_console(driver, storage, UsbDeviceStrings::default());

    join(device.run(), run_console(port)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn run_console<D>(mut port: ConsolePort<D>) -> !
where
    D: embassy_usb::driver::Driver<'static>,
{
    let lines = CONSOLE.receiver();
    let mut pending: Option<ConsoleLine> = None;

    loop {
        port.wait_attached().await;
        defmt::info!("usb: console attached");

        let dropped = CONSOLE.take_dropped();
        if dropped > 0 {
            let mut notice = ConsoleLine::new();
            if write!(notice, "({dropped} lines dropped while detached)\r\n").is_ok()
                && port.write_line(notice.as_bytes()).await.is_err()
            {
                continue;
            }
        }

        loop {
            let line = match pending.take() {
                Some(line) => line,
                None => lines.receive().await,
            };

            match port.write_line(line.as_bytes()).await {
                Ok(()) => {}
                Err(EndpointError::Disabled) => {
                    defmt::warn!("usb: console detached");
                    pending = Some(line);
                    break;
                }
                Err(_) => {
                    defmt::warn!("usb: console write error");
                }
            }

            if !port.sender.dtr() {
                defmt::warn!("usb: host dropped DTR");
                break;
            }
        }
    }
}
