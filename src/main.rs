use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use poolsweep::{
    annotate::Annotator,
    compression::decompress_overlay,
    decoder::ArmDecoder,
    format::OutputFormat,
    sweep::SweepMode,
    Address,
};

/// Linear ARM disassembly with PC-relative literal loads resolved.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Raw ARM image to disassemble
    #[arg(default_value = "ov0.bin")]
    input: PathBuf,

    /// Listing to write, `-` for stdout
    #[arg(short, long, default_value = "ov0.s")]
    output: PathBuf,

    /// Address the first byte of the image is loaded at
    #[arg(short, long, default_value = "0x20aa420", value_parser = parse_address)]
    base: Address,

    /// What to do with words that do not decode
    #[arg(short, long, value_enum, default_value_t = SweepMode::Stop)]
    sweep: SweepMode,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Input is a backward-LZ compressed overlay; decompress it first
    #[arg(short, long)]
    decompress: bool,
}

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_address(s: &str) -> Result<Address, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => Address::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address \"{}\": {}", s, e))
}

fn run(args: &Args) -> Result<()> {
    let mut image = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    log::info!(
        "Loaded {} bytes from {} at 0x{:x}",
        image.len(),
        args.input.display(),
        args.base
    );

    if args.decompress {
        image = decompress_overlay(&image)
            .with_context(|| format!("Failed to decompress {}", args.input.display()))?;
    }

    let decoder = ArmDecoder::new().context("Failed to create ARM decoder")?;
    let annotator = Annotator::new(&image, args.base)
        .with_context(|| format!("Cannot map {} at 0x{:x}", args.input.display(), args.base))?;
    let listing = annotator
        .run(&decoder, args.sweep)
        .with_context(|| format!("Failed to annotate {}", args.input.display()))?;

    let output = args.format.get_formatter().format(&listing)?;

    if args.output.as_os_str() == "-" {
        std::io::stdout()
            .lock()
            .write_all(output.as_bytes())
            .context("Failed to write listing to stdout")?;
    } else {
        fs::write(&args.output, output)
            .with_context(|| format!("Failed to write {}", args.output.display()))?;
        log::info!(
            "Wrote {} lines as {} to {}",
            listing.lines.len(),
            args.format,
            args.output.display()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::debug!("{:?}", args);

    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    const LDR_R0_PC_0X10: [u8; 4] = [0x10, 0x00, 0x9f, 0xe5];
    const MOV_R0_R1: [u8; 4] = [0x01, 0x00, 0xa0, 0xe1];
    const BX_LR: [u8; 4] = [0x1e, 0xff, 0x2f, 0xe1];

    fn args_for(input: &Path, output: &Path, extra: &[&str]) -> Args {
        let mut argv = vec![
            "poolsweep".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::parse_from(argv)
    }

    /// ldr r0, [pc, #0x10] at +0, literal `0xe1a00001` at +0x18
    fn function_with_pool() -> Vec<u8> {
        [
            LDR_R0_PC_0X10,
            MOV_R0_R1,
            BX_LR,
            MOV_R0_R1,
            MOV_R0_R1,
            BX_LR,
            MOV_R0_R1,
        ]
        .concat()
    }

    const POOL_LISTING: &str = "0x20aa420:\tldr\tr0, =0xe1a00001\n\
                                0x20aa424:\tmov\tr0, r1\n\
                                0x20aa428:\tbx\tlr\n\
                                0x20aa42c:\tmov\tr0, r1\n\
                                0x20aa430:\tmov\tr0, r1\n\
                                0x20aa434:\tbx\tlr\n";

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x20aa420"), Ok(0x20aa420));
        assert_eq!(parse_address("0X10"), Ok(0x10));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xzz").is_err());
        assert!(parse_address("base").is_err());
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["poolsweep"]);
        assert_eq!(args.input, PathBuf::from("ov0.bin"));
        assert_eq!(args.output, PathBuf::from("ov0.s"));
        assert_eq!(args.base, 0x20aa420);
        assert_eq!(args.sweep, SweepMode::Stop);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.decompress);
    }

    #[test]
    fn test_override_args() {
        let args = Args::parse_from([
            "poolsweep", "boot.bin", "-o", "-", "-b", "0x8000", "-s", "skip", "-f", "jsonl", "-d",
        ]);
        assert_eq!(args.input, PathBuf::from("boot.bin"));
        assert_eq!(args.output, PathBuf::from("-"));
        assert_eq!(args.base, 0x8000);
        assert_eq!(args.sweep, SweepMode::Skip);
        assert_eq!(args.format, OutputFormat::JsonLines);
        assert!(args.decompress);
    }

    #[test]
    fn test_run_writes_listing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("ov0.s");
        fs::write(&input, function_with_pool()).unwrap();

        run(&args_for(&input, &output, &[])).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), POOL_LISTING);
    }

    #[test]
    fn test_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let first = dir.path().join("first.s");
        let second = dir.path().join("second.s");
        fs::write(&input, function_with_pool()).unwrap();

        run(&args_for(&input, &first, &[])).unwrap();
        run(&args_for(&input, &second, &[])).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing.bin");
        let output = dir.path().join("ov0.s");

        let err = run(&args_for(&input, &output, &[])).unwrap_err();
        assert!(err.to_string().contains("missing.bin"));
        assert!(!output.exists());
    }

    #[test]
    fn test_literal_out_of_range_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("ov0.s");
        fs::write(&input, [LDR_R0_PC_0X10, BX_LR].concat()).unwrap();

        let err = run(&args_for(&input, &output, &[])).unwrap_err();
        assert!(format!("{:#}", err).contains("outside the 8-byte image"));
        assert!(!output.exists());
    }

    #[test]
    fn test_existing_output_is_overwritten() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("ov0.s");
        fs::write(&input, BX_LR).unwrap();
        fs::write(&output, "stale listing that is much longer than the new one\n".repeat(64)).unwrap();

        run(&args_for(&input, &output, &[])).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "0x20aa420:\tbx\tlr\n");
    }

    #[test]
    fn test_unwritable_output_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("no_such_dir").join("ov0.s");
        fs::write(&input, BX_LR).unwrap();

        let err = run(&args_for(&input, &output, &[])).unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }

    #[test]
    fn test_decompress_before_sweep() {
        // Backward-LZ stream: `bx lr` copied out four times by one match
        let mut compressed = vec![0x01, 0x90, 0x1e, 0xff, 0x2f, 0xe1, 0x08];
        compressed.extend_from_slice(&((8u32 << 24) | 15).to_le_bytes());
        compressed.extend_from_slice(&1u32.to_le_bytes());

        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("ov0.s");
        fs::write(&input, &compressed).unwrap();

        run(&args_for(&input, &output, &["--decompress"])).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "0x20aa420:\tbx\tlr\n\
             0x20aa424:\tbx\tlr\n\
             0x20aa428:\tbx\tlr\n\
             0x20aa42c:\tbx\tlr\n"
        );
    }

    #[test]
    fn test_bad_compression_footer_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ov0.bin");
        let output = dir.path().join("ov0.s");
        fs::write(&input, [0u8; 4]).unwrap();

        let err = run(&args_for(&input, &output, &["-d"])).unwrap_err();
        assert!(err.to_string().contains("Failed to decompress"));
        assert!(!output.exists());
    }
}
