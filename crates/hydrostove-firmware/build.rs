//! Links against the esp-hal runtime and bakes monitor overrides from a `.env` file into the firmware.
//!
//! Only `HYDROSTOVE_*` keys are forwarded. They are read at runtime with
//! `option_env!`, so a missing file simply keeps the defaults.

const PREFIX: &str = "HYDROSTOVE_";

fn main() {
    println!("cargo:rustc-link-arg=-nostartfiles");
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=.env");

    let Ok(entries) = dotenvy::from_filename_iter(".env") else {
        return;
    };

    for entry in entries {
        match entry {
            Ok((key, value)) if key.starts_with(PREFIX) => {
                println!("cargo:rustc-env={key}={value}");
            }
            Ok(_) => {}
            Err(e) => println!("cargo:warning=Skipping malformed .env line: {e}"),
        }
    }
}
