use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const ANGLE_BITS: u32 = 13;
const NUM_FINE_ANGLES: usize = 1 << ANGLE_BITS;
const FRACUNIT: f64 = 65536.0;

/// Generates the sine lookup table at build time. Each entry is
/// `sin(i * 360 / NUM_FINE_ANGLES)` rendered as a Q16.16 fixed-point
/// literal so the runtime table is a plain `const` array.
fn generate_sine_table() -> String {
    let mut out = String::new();
    writeln!(
        out,
        "/// Build-time generated sine table, {NUM_FINE_ANGLES} entries, ~0.044 degrees per entry."
    )
    .unwrap();
    writeln!(
        out,
        "pub(crate) const SINE_TABLE: [i32; {NUM_FINE_ANGLES}] = ["
    )
    .unwrap();
    for i in 0..NUM_FINE_ANGLES {
        let degrees = (i as f64) * 360.0 / (NUM_FINE_ANGLES as f64);
        let radians = degrees.to_radians();
        let value = (radians.sin() * FRACUNIT).round() as i32;
        writeln!(out, "    {value},").unwrap();
    }
    writeln!(out, "];").unwrap();
    out
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("sine_table.rs");
    fs::write(&dest, generate_sine_table()).expect("failed to write generated sine table");

    if env::var("CARGO_FEATURE_FFI").is_ok() {
        let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
        let config = cbindgen::Config::from_file("cbindgen.toml").unwrap_or_default();

        if let Ok(bindings) = cbindgen::Builder::new()
            .with_crate(&crate_dir)
            .with_config(config)
            .generate()
        {
            bindings.write_to_file(format!("{crate_dir}/include/tbsp_core.h"));
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
