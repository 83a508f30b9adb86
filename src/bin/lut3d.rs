use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use mp4lut3d::{ColourPrimaries, ColourTransferCharacteristics, CubeFile, Lut3d};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Inject or retrieve 3D LUT tone mapping metadata in MP4/MOV files")]
struct Args {
    /// Add a 3D LUT to the video tracks of the input file
    #[arg(long, action = ArgAction::SetTrue)]
    inject: bool,

    /// Print the 3D LUT stored in the input file
    #[arg(long, action = ArgAction::SetTrue)]
    retrieve: bool,

    /// Input MP4/MOV file
    #[arg(short, long)]
    input: PathBuf,

    /// Output MP4/MOV file (inject only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// .cube file to read from (inject) or write to (retrieve)
    #[arg(short = 'l', long = "lut3d-file")]
    lut3d_file: Option<PathBuf>,

    /// Output colour primaries of the LUT
    #[arg(short, long, default_value = "COLOUR_PRIMARIES_BT709")]
    primaries: ColourPrimaries,

    /// Output transfer characteristics of the LUT
    #[arg(short, long, default_value = "COLOUR_TRANSFER_CHARACTERISTICS_BT709")]
    transfer: ColourTransferCharacteristics,

    /// Print the retrieved metadata as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default = if args.verbose { "mp4lut3d=debug" } else { "mp4lut3d=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match (args.inject, args.retrieve) {
        (true, false) => inject(&args),
        (false, true) => retrieve(&args),
        (true, true) => bail!("--inject and --retrieve are mutually exclusive"),
        (false, false) => bail!("one of --inject or --retrieve is required"),
    }
}

fn inject(args: &Args) -> anyhow::Result<()> {
    let Some(output) = &args.output else {
        bail!("--inject requires --output");
    };
    let Some(cube_path) = &args.lut3d_file else {
        bail!("--inject requires --lut3d-file");
    };

    let cube = CubeFile::from_path(cube_path)
        .with_context(|| format!("reading {}", cube_path.display()))?;
    let mut lut3d = Lut3d::new(args.primaries, args.transfer);
    lut3d.load_cube(&cube)?;
    println!("{lut3d}");

    mp4lut3d::inject_lut3d_file(&args.input, output, &lut3d)
        .with_context(|| format!("injecting into {}", args.input.display()))?;
    println!("Saved file with 3D LUT to {}", output.display());
    Ok(())
}

fn retrieve(args: &Args) -> anyhow::Result<()> {
    let lut3d = mp4lut3d::parse_lut3d_file(&args.input)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    let Some(lut3d) = lut3d else {
        println!("Failed to extract 3D LUT from {}", args.input.display());
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&lut3d.summary())?);
    } else {
        println!("{lut3d}");
    }

    if let Some(path) = &args.lut3d_file {
        lut3d
            .to_cube()
            .write_to_path(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Saved 3D LUT to {}", path.display());
    }
    Ok(())
}
