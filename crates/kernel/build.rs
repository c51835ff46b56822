fn main() {
    // The linker script only applies to the freestanding riscv64 build.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("riscv64") {
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        println!("cargo:rustc-link-arg=-T{manifest_dir}/kernel.ld");
    }
    println!("cargo:rerun-if-changed=kernel.ld");
}
