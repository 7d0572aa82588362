//! AGMV video CLI utility.
//!
//! Provides three subcommands:
//! - `info`: print the header of an AGMV file, optionally as JSON, and list its I-frames
//! - `frames`: decode a range of frames and save each one as a BMP image
//! - `audio`: decode the whole soundtrack and save it as a WAV file
//!
//! Playback options can be loaded from a TOML file with `--config`; any key
//! can also be overridden with an `AGMV_` environment variable, e.g.
//! `AGMV_VOLUME=50`.
//!
//! ```toml
//! audio_enabled = true
//! volume = 80
//! max_dimension = 1024
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Show header fields
//! cargo run --example agmv_utils info intro.agm
//!
//! # Header as JSON plus the I-frame index
//! cargo run --example agmv_utils info intro.agm --json --scan
//!
//! # Export frames 30..40 as BMP
//! cargo run --example agmv_utils frames intro.agm out/ --start 30 --count 10
//!
//! # Export the soundtrack
//! cargo run --example agmv_utils audio intro.agm intro.wav
//! ```

use std::{
	fs::{self, File},
	io::BufWriter,
	path::{Path, PathBuf},
};

use agmv_rs::prelude::*;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use log::{info, warn};

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let cli = Cli::parse();
	let config = load_config(cli.config.as_deref())?;
	match cli.command {
		Command::Info(opts) => run_info(opts, config),
		Command::Frames(opts) => run_frames(opts, config),
		Command::Audio(opts) => run_audio(opts, config),
	}
}

#[derive(Parser)]
#[command(name = "agmv_utils")]
#[command(author = "agmv-rs project")]
#[command(version)]
#[command(about = "Inspect AGMV videos and export their frames and audio", long_about = None)]
struct Cli {
	/// TOML file with playback options
	#[arg(short, long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Print the header of an AGMV file
	Info(InfoArgs),
	/// Export decoded frames as BMP images
	Frames(FramesArgs),
	/// Export the soundtrack as a WAV file
	Audio(AudioArgs),
}

#[derive(Args)]
struct InfoArgs {
	/// Path to an AGMV file
	#[arg(value_name = "FILE")]
	file: PathBuf,

	/// Print the header as JSON
	#[arg(long, default_value_t = false)]
	json: bool,

	/// Walk the whole stream and list every I-frame
	#[arg(short, long, default_value_t = false)]
	scan: bool,
}

#[derive(Args)]
struct FramesArgs {
	/// Path to an AGMV file
	#[arg(value_name = "FILE")]
	file: PathBuf,

	/// Directory receiving `frame_NNNNN.bmp` files
	#[arg(value_name = "OUTPUT_DIR")]
	output: PathBuf,

	/// First frame to export
	#[arg(short, long, value_name = "FRAME", default_value_t = 0)]
	start: u32,

	/// Number of frames to export; all remaining frames if omitted
	#[arg(short = 'n', long, value_name = "COUNT")]
	count: Option<u32>,
}

#[derive(Args)]
struct AudioArgs {
	/// Path to an AGMV file
	#[arg(value_name = "FILE")]
	file: PathBuf,

	/// Output WAV file
	#[arg(value_name = "OUTPUT_WAV")]
	output: PathBuf,
}

/// Loads playback options from an optional TOML file and `AGMV_*` variables.
fn load_config(path: Option<&Path>) -> Result<PlaybackConfig> {
	let mut builder = config::Config::builder();
	if let Some(path) = path {
		builder = builder.add_source(config::File::from(path));
	}
	let settings = builder
		.add_source(config::Environment::with_prefix("AGMV").try_parsing(true))
		.build()
		.context("Failed to load playback configuration")?;

	settings.try_deserialize().context("Invalid playback configuration")
}

fn open_session(path: &Path, config: PlaybackConfig) -> Result<AgmvSession<std::io::BufReader<File>>> {
	AgmvSession::open_with_config(path, config).with_context(|| format!("Failed to open {}", path.display()))
}

/// Decodes one frame, logging and skipping corrupt ones
fn next_frame<R: std::io::Read + std::io::Seek>(session: &mut AgmvSession<R>) -> Result<Option<FrameInfo>> {
	loop {
		match session.decode_next_frame() {
			Ok(DecodeStep::Frame(info)) => return Ok(Some(info)),
			Ok(DecodeStep::EndOfStream) => return Ok(None),
			Ok(DecodeStep::Paused) => session.play_video(),
			Err(e) if e.is_recoverable() => warn!("{e}"),
			Err(e) => return Err(e.into()),
		}
	}
}

fn run_info(args: InfoArgs, config: PlaybackConfig) -> Result<()> {
	let mut session = open_session(&args.file, config)?;
	let header = session.header().clone();

	if args.json {
		println!("{}", serde_json::to_string_pretty(&header)?);
	} else {
		println!("File:        {}", args.file.display());
		println!("Dialect:     {}", header.dialect());
		println!("Dimensions:  {}x{}", header.width(), header.height());
		println!("Frames:      {} @ {} fps", header.num_frames(), header.fps());
		if header.has_audio() {
			println!(
				"Audio:       {} Hz, {} channel(s), {}-bit, {} bytes",
				header.sample_rate(),
				header.num_channels(),
				header.bits_per_sample(),
				header.audio_size()
			);
		} else {
			println!("Audio:       none");
		}
		for (i, palette) in header.palettes().iter().enumerate() {
			println!("Palette {i}:   {palette}");
		}
	}

	if args.scan {
		session.seek_to(u32::MAX)?;
		let index = session.seek_index();
		println!("I-frames:    {}", index.len());
		for entry in index.entries() {
			println!("  frame {:>6} at offset {:#010x}", entry.frame, entry.offset);
		}
	}

	Ok(())
}

fn run_frames(args: FramesArgs, config: PlaybackConfig) -> Result<()> {
	let config = PlaybackConfig {
		audio_enabled: false,
		start_paused: false,
		..config
	};
	let mut session = open_session(&args.file, config)?;
	let (width, height) = (session.header().width(), session.header().height());

	fs::create_dir_all(&args.output)
		.with_context(|| format!("Failed to create {}", args.output.display()))?;

	session.seek_to(args.start)?;
	let end = args.count.map(|count| args.start.saturating_add(count));
	let mut saved = 0usize;

	while let Some(frame) = next_frame(&mut session)? {
		if frame.number < args.start {
			continue;
		}
		if end.is_some_and(|end| frame.number >= end) {
			break;
		}

		let rgb = session.reference_frames().current().to_rgb888();
		let image = RgbImage::from_raw(width, height, rgb).context("Frame buffer does not match dimensions")?;
		let path = args.output.join(format!("frame_{:05}.bmp", frame.number));
		image.save(&path).with_context(|| format!("Failed to save {}", path.display()))?;
		saved += 1;
	}

	if saved == 0 {
		bail!("No frames at or after {} in {}", args.start, args.file.display());
	}
	info!("Saved {saved} frames to {}", args.output.display());
	Ok(())
}

fn run_audio(args: AudioArgs, config: PlaybackConfig) -> Result<()> {
	let config = PlaybackConfig {
		audio_enabled: true,
		start_paused: false,
		..config
	};
	let mut session = open_session(&args.file, config)?;
	if session.is_audio_disabled() {
		bail!("{} has no audio track", args.file.display());
	}

	let mut chunks: Vec<Pcm> = Vec::new();
	while next_frame(&mut session)?.is_some() {
		session.pump_audio(&mut chunks);
	}

	let mut chunks = chunks.into_iter();
	let Some(mut soundtrack) = chunks.next() else {
		bail!("{} contains no audio chunks", args.file.display());
	};
	for chunk in chunks {
		soundtrack.append(&chunk)?;
	}

	let header = session.header();
	let mut writer = BufWriter::new(
		File::create(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?,
	);
	soundtrack.write_wav(&mut writer, header.sample_rate(), header.num_channels())?;

	info!(
		"Wrote {} samples ({} Hz, {}-bit) to {}",
		soundtrack.len(),
		header.sample_rate(),
		soundtrack.bits_per_sample(),
		args.output.display()
	);
	Ok(())
}
