//! Bandstand CLI Tool
//!
//! Command-line interface for resolving live timetables and baking the club
//! logo into photo booth stills.

use anyhow::{Context, Result};
use bandstand_compositor::{OverlayAsset, OverlayCompositor};
use bandstand_core::{
    default_variants, DisplayMode, FixedClock, ScheduleQuery, ScheduleResolver, ScheduleStatus,
    ScheduleView, Timetable,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bandstand")]
#[command(about = "Bandstand - live timetable and photo booth tools for the light-music club")]
#[command(version)]
struct Cli {
    /// Log geometry and resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who is on stage for a timetable file
    Schedule {
        /// Timetable JSON file path
        timetable: PathBuf,

        /// Resolve at this instant instead of now (RFC 3339, e.g. 2024-12-21T15:32:00+09:00)
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,

        /// Show only the previous, current and next slot
        #[arg(long)]
        windowed: bool,
    },

    /// Bake an overlay into a still frame
    Capture {
        /// Camera frame image
        #[arg(long)]
        frame: PathBuf,

        /// Overlay logo image
        #[arg(long)]
        overlay: PathBuf,

        /// Output image path (format from extension)
        #[arg(short, long)]
        output: PathBuf,

        /// Overlay variant key
        #[arg(long, default_value = "front")]
        variant: String,

        /// Overlay width in percent of the frame width
        #[arg(long)]
        width: Option<f64>,

        /// Overlay center X in percent of the frame width
        #[arg(long)]
        center_x: Option<f64>,

        /// Overlay center Y in percent of the frame height
        #[arg(long)]
        center_y: Option<f64>,
    },

    /// List the overlay variants
    Variants,
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 instant: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Schedule {
            timetable,
            now,
            windowed,
        } => show_schedule(timetable, now, windowed)?,

        Commands::Capture {
            frame,
            overlay,
            output,
            variant,
            width,
            center_x,
            center_y,
        } => capture_still(frame, overlay, output, &variant, width, center_x, center_y)?,

        Commands::Variants => print_variants(),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn show_schedule(path: PathBuf, now: Option<DateTime<Utc>>, windowed: bool) -> Result<()> {
    let file = File::open(&path).context("Failed to open timetable")?;
    let timetable = Timetable::read(BufReader::new(file)).context("Failed to read timetable")?;
    tracing::info!(
        path = %path.display(),
        event_date = %timetable.event_date,
        slots = timetable.slots.len(),
        "loaded timetable"
    );

    let mut config = timetable
        .resolver_config()
        .context("Invalid timetable configuration")?;
    if windowed {
        config.display_mode = DisplayMode::Windowed;
    }

    let mut resolver = ScheduleResolver::new(timetable.slots, timetable.event_date, config);
    if let Some(now) = now {
        tracing::info!(%now, "using simulated clock");
        resolver = resolver.with_clock(FixedClock(now));
    }

    let (query, view) = resolver.snapshot();
    print_schedule(&resolver, &view, &query);
    Ok(())
}

fn print_schedule(resolver: &ScheduleResolver, view: &ScheduleView, query: &ScheduleQuery) {
    let slots = resolver.slots();

    println!("\n=== {} (now {} {}) ===", resolver.event_date(), query.date, query.time);
    let status = match view.status {
        ScheduleStatus::NoSlots => "No slots scheduled".to_string(),
        ScheduleStatus::NotToday => "Not event day".to_string(),
        ScheduleStatus::NotStarted => "Not started yet".to_string(),
        ScheduleStatus::Performing => view
            .active_slot_index
            .and_then(|i| slots.get(i))
            .map(|slot| format!("On stage: {}", slot.name))
            .unwrap_or_default(),
        ScheduleStatus::Break => "Break".to_string(),
        ScheduleStatus::Finished => "Finished".to_string(),
    };
    println!("{}", status);

    if let Some(next) = view.next_slot_index.and_then(|i| slots.get(i)) {
        match view.minutes_until_next(slots, query) {
            Some(minutes) => println!("Next: {} at {} (in {} min)", next.name, next.start, minutes),
            None => println!("Next: {} on {} at {}", next.name, next.date, next.start),
        }
    }

    println!();
    for index in view.visible_window.clone() {
        if let Some(gap) = index.checked_sub(1).and_then(|i| view.gaps.get(i)) {
            if gap.is_rendered() && view.visible_window.contains(&gap.previous) {
                let marker = if gap.is_current { ">" } else { " " };
                println!("{}   ~ break {} min ~", marker, gap.minutes);
            }
        }

        let slot = &slots[index];
        let marker = if view.active_slot_index == Some(index) { ">" } else { " " };
        println!("{} {}-{}  {}", marker, slot.start, slot.end, slot.name);
    }
}

fn capture_still(
    frame_path: PathBuf,
    overlay_path: PathBuf,
    output: PathBuf,
    variant: &str,
    width: Option<f64>,
    center_x: Option<f64>,
    center_y: Option<f64>,
) -> Result<()> {
    let frame = image::open(&frame_path).context("Failed to open frame image")?;
    let overlay = OverlayAsset::open(&overlay_path);

    let mut compositor = OverlayCompositor::with_default_variants(
        f64::from(frame.width()) / f64::from(frame.height().max(1)),
    )
    .context("Failed to set up compositor")?;
    compositor
        .select_variant(variant)
        .context("Failed to select overlay variant")?;

    if let Some(width) = width {
        compositor.set_width_percent(width);
    }
    if center_x.is_some() || center_y.is_some() {
        let current = compositor.geometry();
        compositor.set_center(
            center_x.unwrap_or(current.center_x_percent),
            center_y.unwrap_or(current.center_y_percent),
        );
    }

    let geometry = compositor.geometry();
    println!(
        "Overlay {}: width {:.1}% at ({:.1}%, {:.1}%)",
        variant, geometry.width_percent, geometry.center_x_percent, geometry.center_y_percent
    );

    let composite = compositor
        .capture(&frame, &overlay)
        .context("Failed to capture composite")?;
    composite.save(&output).context("Failed to save composite")?;

    println!(
        "Saved {}x{} still to {}",
        composite.width(),
        composite.height(),
        output.display()
    );
    Ok(())
}

fn print_variants() {
    println!("\n=== Overlay Variants ===");
    for variant in default_variants() {
        let geometry = variant.default_geometry;
        println!(
            "  {}: {}x{} px, width {:.0}-{:.0}%, default {:.0}% at ({:.0}%, {:.0}%)",
            variant.key,
            variant.natural_width,
            variant.natural_height,
            variant.size_range.min(),
            variant.size_range.max(),
            geometry.width_percent,
            geometry.center_x_percent,
            geometry.center_y_percent
        );
    }
}
