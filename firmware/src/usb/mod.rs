#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! USB CDC ACM console.
//!
//! One CDC ACM interface carries the monitor output to the host terminal.
//! The builder wrapper owns the Embassy USB bookkeeping so the runtime only
//! deals with the resulting device and port handle.

/// Bulk endpoint size for full-speed CDC.
pub const MAX_PACKET_SIZE: u16 = 64;

#[cfg(target_os = "none")]
const CONTROL_BUFFER_LEN: usize = 64;
#[cfg(target_os = "none")]
const CONFIG_DESCRIPTOR_LEN: usize = 128;
#[cfg(target_os = "none")]
const BOS_DESCRIPTOR_LEN: usize = 64;
#[cfg(target_os = "none")]
const MSOS_DESCRIPTOR_LEN: usize = 64;

/// User-visible strings advertised in the USB descriptors.
#[derive(Clone, Copy, Debug)]
pub struct UsbDeviceStrings {
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
}

impl Default for UsbDeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: "Bench Monitor",
            product: "ADC and Charger Console",
            serial_number: None,
        }
    }
}

/// Splits `line` into bulk packets no larger than [`MAX_PACKET_SIZE`].
pub fn packets(line: &[u8]) -> core::slice::Chunks<'_, u8> {
    line.chunks(usize::from(MAX_PACKET_SIZE))
}

/// A transfer that ends on a full packet must be closed with a zero-length
/// packet or the host keeps waiting for more data.
pub fn needs_zero_length_packet(len: usize) -> bool {
    len != 0 && len % usize::from(MAX_PACKET_SIZE) == 0
}

/// Backing storage for the Embassy USB builder and the CDC ACM class.
#[cfg(target_os = "none")]
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
    console_state: embassy_usb::class::cdc_acm::State<'static>,
}

#[cfg(target_os = "none")]
impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
            console_state: embassy_usb::class::cdc_acm::State::new(),
        }
    }
}

/// Output half of the console interface plus its line-state notifications.
#[cfg(target_os = "none")]
pub struct ConsolePort<D: embassy_usb::driver::Driver<'static>> {
    pub sender: embassy_usb::class::cdc_acm::Sender<'static, D>,
    pub control: embassy_usb::class::cdc_acm::ControlChanged<'static>,
}

#[cfg(target_os = "none")]
impl<D> ConsolePort<D>
where
    D: embassy_usb::driver::Driver<'static>,
{
    /// Waits until the host configures the interface and asserts DTR.
    pub async fn wait_attached(&mut self) {
        self.sender.wait_connection().await;
        while !self.sender.dtr() {
            self.control.control_changed().await;
        }
    }

    /// Writes one console line, closing the transfer with a ZLP when needed.
    pub async fn write_line(
        &mut self,
        line: &[u8],
    ) -> Result<(), embassy_usb::driver::EndpointError> {
        for packet in packets(line) {
            self.sender.write_packet(packet).await?;
        }
        if needs_zero_length_packet(line.len()) {
            self.sender.write_packet(&[]).await?;
        }
        Ok(())
    }
}

/// Builds the USB device exposing the console interface.
#[cfg(target_os = "none")]
pub fn build_console<D>(
    driver: D,
    storage: &'static mut UsbDeviceStorage,
    strings: UsbDeviceStrings,
) -> (embassy_usb::UsbDevice<'static, D>, ConsolePort<D>)
where
    D: embassy_usb::driver::Driver<'static>,
{
    let mut config = embassy_usb::Config::new(0x1209, 0x0001);
    config.manufacturer = Some(strings.manufacturer);
    config.product = Some(strings.product);
    config.serial_number = strings.serial_number;
    config.max_packet_size_0 = 64;
    config.max_power = 100;

    let mut builder = embassy_usb::Builder::new(
        driver,
        config,
        &mut storage.config_descriptor,
        &mut storage.bos_descriptor,
        &mut storage.msos_descriptor,
        &mut storage.control_buf,
    );

    let class = embassy_usb::class::cdc_acm::CdcAcmClass::new(
        &mut builder,
        &mut storage.console_state,
        MAX_PACKET_SIZE,
    );
    // Output only. Host keystrokes are never read.
    let (sender, _receiver, control) = class.split_with_control();

    (builder.build(), ConsolePort { sender, control })
}
