use std::path::PathBuf;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Parse a firmware file and print what was found
    Info(InfoOpts),
    /// Write the bare firmware image without any bootloader data
    Extract(ExtractOpts),
    /// Retarget a signed TI firmware (BOT03.02) to the unsigned bootloader BOT03.01
    Downgrade(DowngradeOpts),
}

#[derive(StructOpt, Debug)]
pub struct InfoOpts {
    /// The firmware file, either Intel HEX or a raw binary dump
    #[structopt(required = true)]
    pub filename: PathBuf,
    /// A detached 256 byte signature to attach to the firmware
    #[structopt(short = "s", long = "signature")]
    pub signature: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
pub struct ExtractOpts {
    /// The firmware file, either Intel HEX or a raw binary dump
    #[structopt(required = true)]
    pub filename: PathBuf,
    /// The name of the file to save the image to
    #[structopt(short = "o", long = "output", default_value = "firmware.bin")]
    pub output: PathBuf,
    /// Also save the embedded signature, if the firmware carries one
    #[structopt(long = "signature-out")]
    pub signature_output: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
pub struct DowngradeOpts {
    /// The firmware file, either Intel HEX or a raw binary dump
    #[structopt(required = true)]
    pub filename: PathBuf,
    /// The name of the file to save the downgraded image to
    #[structopt(
        env = "UNIFW_OUTPUT",
        short = "o",
        long = "output",
        default_value = "firmware_bot0301.bin"
    )]
    pub output: PathBuf,
}

#[derive(StructOpt, Debug)]
#[structopt(about = "Logitech Unifying receiver firmware utility")]
pub struct Opts {
    #[structopt(subcommand)]
    pub command: Command,
}
