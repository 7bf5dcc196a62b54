use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    defmt::error!("monitor firmware panicked: {}", defmt::Display2Format(info));
    cortex_m::asm::udf();
}
