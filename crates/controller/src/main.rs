#[cfg(feature = "adc")]
mod adc;
mod clock;
mod config;
mod relay;
mod reload;
mod sim;

use anyhow::Result;
use greenhouse_core::{AmbientLightSensor, Clock, ControlCycle, Outputs, SharedState};
use std::{env, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use clock::MonotonicClock;
use relay::RelayBoard;
use sim::{GreenhouseSim, Scenario};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config file ─────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "greenhouse.toml".to_string());
    let cfg = config::load(&config_path)?;

    // Many common relay boards are active-low. If yours is active-high, set false.
    let active_low = env::var("RELAY_ACTIVE_LOW")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(cfg.outputs.active_low);

    let scenario = Scenario::from_str_lossy(
        &env::var("SIM_SCENARIO").unwrap_or_else(|_| cfg.sim.scenario.clone()),
    );

    info!(
        config = %config_path,
        cycle_ms = cfg.control.cycle_ms,
        %scenario,
        active_low,
        "greenhouse controller starting"
    );

    // ── Relay board ─────────────────────────────────────────────────
    let mut board = RelayBoard::new(cfg.output_pins(), active_low)?;
    board.all_off();

    // ── Control core ────────────────────────────────────────────────
    let clock = MonotonicClock::new();
    let now = clock.now_ms();
    let mut state = SharedState::new(cfg.targets());
    let mut cycle = ControlCycle::new(now, cfg.light(), cfg.climate(), &mut board.lamp);

    // ── Sensors ─────────────────────────────────────────────────────
    let mut sim = GreenhouseSim::new(scenario, now, cfg.light.day_length_ms);
    #[cfg(feature = "adc")]
    let mut adc_light = adc::Ads1115Light::new(cfg.light.adc_address, cfg.light.adc_channel)?;

    // ── Configuration channel ───────────────────────────────────────
    let mut targets_rx = reload::spawn(
        config_path,
        Duration::from_secs(cfg.control.reload_every_s),
        state.targets,
    );

    // ── Control loop ────────────────────────────────────────────────
    let mut ticker = interval(Duration::from_millis(cfg.control.cycle_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut report = interval(Duration::from_secs(cfg.control.report_every_s));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Targets only change between cycles.
                if targets_rx.has_changed().unwrap_or(false) {
                    state.targets = *targets_rx.borrow_and_update();
                }

                let now = clock.now_ms();
                sim.advance(now, state.heater_on, state.mister_on);

                #[cfg(feature = "adc")]
                let ambient: &mut dyn AmbientLightSensor = &mut adc_light;
                #[cfg(not(feature = "adc"))]
                let ambient: &mut dyn AmbientLightSensor = &mut sim.light;

                let before = (state.lamp_on, state.heater_on, state.mister_on);
                cycle.run(
                    now,
                    &mut sim.climate,
                    ambient,
                    Outputs {
                        lamp: &mut board.lamp,
                        heater: &mut board.heater,
                        mister: &mut board.mister,
                    },
                    &mut state,
                );
                if before != (state.lamp_on, state.heater_on, state.mister_on) {
                    info!(
                        lamp = state.lamp_on,
                        heater = state.heater_on,
                        mister = state.mister_on,
                        "outputs changed"
                    );
                }
            }
            _ = report.tick() => {
                report_status(&state, &sim);
            }
            res = &mut shutdown => {
                if let Err(e) = res {
                    tracing::error!("ctrl-c handler failed: {e}");
                }
                break;
            }
        }
    }

    // Fail-safe on the way out.
    board.all_off();
    info!(
        lamp = board.lamp.is_on(),
        heater = board.heater.is_on(),
        mister = board.mister.is_on(),
        "greenhouse controller stopped, outputs off"
    );
    Ok(())
}

/// Reporting channel: one JSON status line.
fn report_status(state: &SharedState, sim: &GreenhouseSim) {
    match serde_json::to_string(&state.to_status()) {
        Ok(json) => info!(status = %json, "status"),
        Err(e) => tracing::error!("failed to serialise status: {e}"),
    }
    debug!(
        true_temp_c = format!("{:.2}", sim.climate.true_temp_c()),
        true_humidity_pct = format!("{:.1}", sim.climate.true_humidity_pct()),
        light_reads = sim.light.reads(),
        "sim truth"
    );
}
