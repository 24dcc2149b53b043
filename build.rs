// Build script for TalkTagger client
// Copies the sample config file next to the built binary

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Tell Cargo to rerun this script if the config file changes
    println!("cargo:rerun-if-changed=talktagger.toml");

    let out_dir = env::var("OUT_DIR").unwrap();

    // OUT_DIR = target/<profile>/build/<crate>-<hash>/out
    let out_path = Path::new(&out_dir);
    let target_dir = out_path
        .ancestors()
        .nth(3)
        .expect("Could not find target directory");

    let config_src = Path::new("talktagger.toml");
    let config_dst = target_dir.join("talktagger.toml");

    if config_src.exists() && !config_dst.exists() {
        fs::copy(config_src, &config_dst).expect("Failed to copy config file");
        println!(
            "cargo:warning=Copied config file to {}",
            config_dst.display()
        );
    }
}
