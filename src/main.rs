use std::fs;
use std::path::Path;

use anyhow::Context;
use log::warn;
use structopt::StructOpt;

use unifw::Firmware;

mod cli;

fn load_firmware<P: AsRef<Path>>(path: P) -> Result<Firmware, anyhow::Error> {
    let path = path.as_ref();

    Firmware::from_path(path)
        .with_context(|| format!("Failed to parse firmware file '{}'", path.display()))
}

fn info(opts: &cli::InfoOpts) -> Result<(), anyhow::Error> {
    let mut firmware = load_firmware(&opts.filename)?;

    if let Some(path) = &opts.signature {
        let signature = fs::read(path)
            .with_context(|| format!("Could not read signature file '{}'", path.display()))?;

        firmware
            .attach_signature(&signature)
            .with_context(|| format!("Could not attach signature '{}'", path.display()))?;
    }

    println!("Target:     {}", firmware.target_type());
    println!("Bootloader: {}", firmware.has_bootloader());
    println!("Signature:  {}", firmware.has_signature());
    println!("SHA-256:    {}", firmware.sha256());
    println!("{}", firmware);

    Ok(())
}

fn extract(opts: &cli::ExtractOpts) -> Result<(), anyhow::Error> {
    let firmware = load_firmware(&opts.filename)?;

    fs::write(&opts.output, firmware.base_image())
        .with_context(|| format!("Could not write image to '{}'", opts.output.display()))?;

    println!(
        "Wrote {:#06x} bytes to {}",
        firmware.size(),
        opts.output.display()
    );

    if let Some(path) = &opts.signature_output {
        match firmware.signature() {
            Some(signature) => {
                fs::write(path, signature)
                    .with_context(|| format!("Could not write signature to '{}'", path.display()))?;

                println!("Wrote signature to {}", path.display());
            }
            None => warn!("Firmware has no signature, not writing {}", path.display()),
        }
    }

    Ok(())
}

fn downgrade(opts: &cli::DowngradeOpts) -> Result<(), anyhow::Error> {
    let firmware = load_firmware(&opts.filename)?;

    println!("{}", firmware);

    let image = firmware
        .downgrade_to_bot0301()
        .with_context(|| "Failed to downgrade firmware")?;

    fs::write(&opts.output, &image)
        .with_context(|| format!("Could not write image to '{}'", opts.output.display()))?;

    println!(
        "Wrote downgraded image of {:#06x} bytes to {}",
        image.len(),
        opts.output.display()
    );

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    use cli::Command;

    // Create a logger with a timestamp, filtered through RUST_LOG
    pretty_env_logger::init_timed();

    // Parse the command-line arguments
    let opts = cli::Opts::from_args();

    match &opts.command {
        Command::Info(info_opts) => info(info_opts)?,
        Command::Extract(extract_opts) => extract(extract_opts)?,
        Command::Downgrade(downgrade_opts) => downgrade(downgrade_opts)?,
    }

    Ok(())
}
