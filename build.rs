use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        // Host builds carry only the portable update engine
        return;
    }

    // Configure for ATmega128A
    println!("cargo:rustc-link-arg-bins=-mmcu=atmega128");

    // Image is linked into the 8 KiB boot section (BOOTSZ = 00)
    println!("cargo:rustc-link-arg-bins=-Wl,--section-start=.text=0x1E000");

    // Pass CPU frequency for timing calculations
    println!("cargo:rustc-env=MCU_FREQ_HZ=16000000");

    println!("cargo:warning=Building bootloader for ATmega128A at 16MHz");
}
