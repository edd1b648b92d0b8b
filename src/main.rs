//! Scripted drag session: a box selection over a scatter trace followed by a
//! drawn rectangle, printed as a document JSON.
//!
//! Usage: `plotsel-demo [config.json]`

use std::process::ExitCode;

use plotsel::{
    Document, DragMode, InteractionConfig, Interaction, Layout, PointerEvent, RecordedEvents, ScatterTrace,
};
use plotsel_geom::Surface;
use web_time::{Duration, Instant};

fn load_config() -> Result<InteractionConfig, plotsel::PlotselError> {
    match std::env::args().nth(1) {
        Some(path) => InteractionConfig::from_json(&std::fs::read_to_string(path)?),
        None => Ok(InteractionConfig::default()),
    }
}

fn drag(
    interaction: &mut Interaction<RecordedEvents>,
    doc: &mut Document,
    from: (f64, f64),
    to: (f64, f64),
    start: Instant,
) {
    let steps = 8;
    interaction.pointer_down(doc, &PointerEvent::new(from.0, from.1, start));
    let mut last = start;
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        last = start + Duration::from_millis(20 * i as u64);
        let ev = PointerEvent::new(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t, last);
        interaction.pointer_move(doc, &ev);
        interaction.tick(doc, last);
    }
    interaction.pointer_up(doc, &PointerEvent::new(to.0, to.1, last));
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .init();

    let layout = Layout::single(Surface::new(80.0, 100.0, 400.0, 300.0), [0.0, 10.0], [0.0, 10.0]);
    let mut doc = Document::new(config.clone().with_dragmode(DragMode::Select), layout);
    doc.traces.push(Box::new(ScatterTrace::new(
        vec![1.0, 3.0, 5.0, 7.0, 9.0],
        vec![2.0, 4.0, 6.0, 4.0, 2.0],
    )));
    let mut interaction = Interaction::new("demo", &doc.config, RecordedEvents::new());

    let t0 = Instant::now();
    drag(&mut interaction, &mut doc, (160.0, 150.0), (400.0, 350.0), t0);
    if let Some(Some(data)) = interaction.events().last_selected() {
        log::info!("Selected {} points", data.points.len());
        for p in &data.points {
            log::info!("  trace {} point {} at ({}, {})", p.curve_number, p.point_number, p.x, p.y);
        }
    }

    interaction.set_dragmode(&mut doc, DragMode::DrawRect);
    drag(&mut interaction, &mut doc, (100.0, 120.0), (200.0, 200.0), t0 + Duration::from_secs(1));

    match doc.to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not serialize document: {}", e);
            ExitCode::FAILURE
        }
    }
}
