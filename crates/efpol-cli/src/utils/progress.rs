use crate::utils::report::format_snapshot;
use efpol::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

struct BarState {
    pb: ProgressBar,
    phase: String,
    /// Set between `TaskStart` and `TaskFinish`; phase events then leave the bar alone.
    task_active: bool,
}

#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState {
                pb,
                phase: String::new(),
                task_active: false,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);

        Box::new(move |progress: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } if guard.task_active => {
                    guard.phase = name.to_string();
                }
                Progress::PhaseStart { name } => {
                    let pb = &guard.pb;
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name.to_string());
                    guard.phase = name.to_string();
                }
                Progress::PhaseFinish if guard.task_active => {
                    guard.phase.clear();
                }
                Progress::PhaseFinish => {
                    guard.pb.disable_steady_tick();
                    guard.pb.finish_with_message(format!("✓ {}", guard.phase));
                    guard.phase.clear();
                }
                Progress::TaskStart { total_steps } => {
                    let pb = &guard.pb;
                    pb.disable_steady_tick();
                    pb.reset();
                    pb.set_length(total_steps);
                    pb.set_position(0);
                    pb.set_style(Self::bar_style());
                    pb.set_message("Optimization");
                    guard.task_active = true;
                }
                Progress::TaskIncrement => {
                    guard.pb.inc(1);
                }
                Progress::TaskFinish => {
                    let pb = &guard.pb;
                    if pb.position() < pb.length().unwrap_or(0) {
                        pb.set_position(pb.length().unwrap_or(0));
                    }
                    pb.finish();
                    guard.task_active = false;
                }
                Progress::ScfIteration { .. } if guard.task_active => {}
                Progress::ScfIteration { iteration, conv } => {
                    let message =
                        format!("{} (iteration {}, conv {:.2e})", guard.phase, iteration, conv);
                    guard.pb.set_message(message);
                }
                Progress::Optimization(snapshot) => {
                    let text = format_snapshot(&snapshot);
                    guard.pb.suspend(|| println!("{}", text));
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
