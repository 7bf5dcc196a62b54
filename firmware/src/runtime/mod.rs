use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use monitor_core::board::{Application, MissingCapability};
use static_cell::StaticCell;

use crate::board::{BOARD, LED_OWNER};
use crate::console::ConsoleQueue;
use crate::usb;

mod adc_task;
mod charger_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static CONSOLE: ConsoleQueue = ConsoleQueue::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

/// Mirrors `text` to defmt and queues it for the USB console.
pub(super) fn announce(text: &str) {
    defmt::info!("{}", text);
    if CONSOLE.publish_text(text).is_err() {
        defmt::warn!("console: dropped announcement");
    }
}

fn announce_error(missing: &MissingCapability) {
    if CONSOLE.publish_text(missing).is_err() {
        defmt::warn!("console: dropped startup error");
    }
}

fn supported(application: Application) -> bool {
    match BOARD.check(application) {
        Ok(()) => true,
        Err(missing) => {
            defmt::error!("{}", defmt::Display2Format(&missing));
            announce_error(&missing);
            false
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA5,
        PB6,
        PB7,
        ADC1,
        I2C1,
        USB,
        PA11,
        PA12,
        ..
    } = hal::init(config);

    defmt::info!("board: {}", BOARD.name);

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB console task");

    let led = BOARD
        .status_led
        .map(|_| Output::new(PA5, Level::Low, Speed::Low));
    let (adc_led, charger_led) = match LED_OWNER {
        Application::AdcMonitor => (led, None),
        Application::ChargerProbe => (None, led),
    };

    if supported(Application::AdcMonitor) {
        spawner
            .spawn(adc_task::run(ADC1, PA0, adc_led))
            .expect("failed to spawn ADC monitor task");
    }

    if supported(Application::ChargerProbe) {
        spawner
            .spawn(charger_task::run(I2C1, PB6, PB7, charger_led))
            .expect("failed to spawn charger probe task");
    }

    core::future::pending::<()>().await;
}
