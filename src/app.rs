use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke};
use tracing::warn;

use crate::audio_engine::AudioEngine;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::recording::TraceCapture;
use crate::simulation::Simulation;
use crate::steps::{definition, STEPS};
use crate::transport::{AudioOutput, NoAudio, RecordingStart};
use crate::types::{ProcessStep, MAX_SIM_SPEED, MIN_SIM_SPEED, SIM_SPEED_STEP};

const COLD: Color32 = Color32::from_rgb(59, 130, 246);
const PREHEAT: Color32 = Color32::from_rgb(249, 115, 22);
const HOT: Color32 = Color32::from_rgb(239, 68, 68);
const DISCHARGE: Color32 = Color32::from_rgb(234, 179, 8);
const EMPTY: Color32 = Color32::from_rgb(51, 65, 85);
const ERROR_RED: Color32 = Color32::from_rgb(230, 100, 100);

pub struct ProcessApp {
    sim: Simulation<SystemClock>,
    audio: Option<AudioEngine>,
    audio_error: Option<String>,
    capture: TraceCapture,
    record_error: Option<String>,
}

impl ProcessApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: &Config) -> Self {
        let mut sim = Simulation::new(SystemClock::new());
        sim.set_speed(config.initial_speed);

        let (audio, audio_error) = if config.audio_enabled {
            match AudioEngine::new(config.muted) {
                Ok(engine) => (Some(engine), None),
                Err(err) => {
                    warn!(%err, "audio offline");
                    (None, Some(err.to_string()))
                }
            }
        } else {
            (None, None)
        };

        if let Some(engine) = &audio {
            sim.subscribe(engine.projection());
        }

        Self {
            sim,
            audio,
            audio_error,
            capture: TraceCapture::new(config.record_to.clone()),
            record_error: None,
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Transport");
        let playing = self.sim.state().is_playing;

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!playing, egui::Button::new("⏮ Previous"))
                .clicked()
            {
                self.sim.previous();
            }

            if ui.button(if playing { "⏸ Pause" } else { "▶ Play" }).clicked() {
                let audio: &dyn AudioOutput = match &self.audio {
                    Some(engine) => engine,
                    None => &NoAudio,
                };
                self.sim.play_pause(audio);
            }

            if ui.add_enabled(!playing, egui::Button::new("Next ⏭")).clicked() {
                self.sim.next();
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Reset").on_hover_text("Reset process").clicked() {
                self.sim.reset();
            }

            let recording = self.sim.is_recording();
            if ui
                .add_enabled(!recording, egui::Button::new("⏺ Record"))
                .on_hover_text("Restart from idle and record one full cycle")
                .clicked()
            {
                self.start_recording();
            }
            if ui.add_enabled(recording, egui::Button::new("Stop recording")).clicked() {
                self.sim.stop_recording();
            }
        });

        ui.separator();

        let state = *self.sim.state();
        let timer_label = format!(
            "{} {}",
            if state.is_timer_paused { "⏸" } else { "⏱" },
            format_elapsed(state.time_elapsed)
        );
        if ui
            .button(timer_label)
            .on_hover_text(if state.is_timer_paused {
                "Click to resume timer"
            } else {
                "Click to pause timer"
            })
            .clicked()
        {
            self.sim.toggle_timer();
        }

        let mut speed = state.sim_speed;
        let slider = ui.add(
            egui::Slider::new(&mut speed, MIN_SIM_SPEED..=MAX_SIM_SPEED)
                .step_by(SIM_SPEED_STEP)
                .suffix("x")
                .text("speed"),
        );
        if slider.changed() {
            self.sim.set_speed(speed);
        }

        ui.separator();
        if let Some(audio) = &self.audio {
            let muted = audio.is_muted();
            if ui.button(if muted { "🔇 Unmute" } else { "🔊 Mute" }).clicked() {
                audio.toggle_mute();
            }
            ui.label(format!("Audio device: {}", audio.device_name));
            ui.label(format!("Sample rate: {} Hz", audio.sample_rate));
        } else if let Some(err) = &self.audio_error {
            ui.colored_label(ERROR_RED, format!("Audio offline: {err}"));
        }

        if self.sim.is_recording() {
            ui.colored_label(HOT, "● Recording");
        }
        if let Some(err) = &self.record_error {
            ui.colored_label(
                ERROR_RED,
                format!("Unable to start recording. Technical error: {err}"),
            );
        }
    }

    fn start_recording(&mut self) {
        let audio: &dyn AudioOutput = match &self.audio {
            Some(engine) => engine,
            None => &NoAudio,
        };
        match self.sim.start_recording_run(&mut self.capture, audio) {
            Ok(RecordingStart::Started) | Ok(RecordingStart::AlreadyRecording) => {
                self.record_error = None;
            }
            Ok(RecordingStart::Declined) => {}
            Err(err) => self.record_error = Some(err.to_string()),
        }
    }

    fn draw_process(&mut self, ui: &mut egui::Ui) {
        let state = *self.sim.state();
        let current = definition(state.step);

        ui.heading("Subcritical Water Hydrolysis Process for Organic Waste");
        ui.horizontal(|ui| {
            ui.label(format!("temperature: {:.0} °C", state.temperature));
            ui.separator();
            ui.label(format!("pressure: {:.1} MPa", state.pressure));
            ui.separator();
            ui.label(format!("speed: {:.1}x", state.sim_speed));
            ui.separator();
            ui.label(format!("elapsed: {}", format_elapsed(state.time_elapsed)));
        });

        ui.separator();
        self.draw_step_strip(ui, state.step);

        ui.add(
            egui::ProgressBar::new(self.sim.step_fraction() as f32)
                .fill(fluid_color(state.step))
                .text(current.title),
        );

        ui.add_space(8.0);
        ui.label(egui::RichText::new(current.title).strong().size(18.0));
        ui.label(current.description);
        ui.label(egui::RichText::new(current.details).italics());
    }

    fn draw_step_strip(&self, ui: &mut egui::Ui, active: ProcessStep) {
        let width = ui.available_width();
        let height = 64.0;
        let (response, painter) = ui.allocate_painter(egui::vec2(width, height), Sense::hover());
        let rect = response.rect;
        let slot = rect.width() / STEPS.len() as f32;
        let mut hovered = None;

        for (idx, def) in STEPS.iter().enumerate() {
            let min = egui::pos2(rect.left() + slot * idx as f32 + 4.0, rect.top() + 4.0);
            let cell = egui::Rect::from_min_size(min, egui::vec2(slot - 8.0, height - 8.0));
            let fill = if def.step == active {
                fluid_color(def.step)
            } else {
                EMPTY
            };
            painter.rect_filled(cell, 6.0, fill);
            if def.step == active {
                painter.rect_stroke(cell, 6.0, Stroke::new(2.0, Color32::WHITE));
            }
            painter.text(
                cell.center(),
                Align2::CENTER_CENTER,
                def.title,
                FontId::proportional(12.0),
                Color32::WHITE,
            );

            if response.hover_pos().is_some_and(|pos| cell.contains(pos)) {
                hovered = Some(def.step);
            }
        }

        if let Some(step) = hovered {
            let def = definition(step);
            response.on_hover_text(format!("{}\n{}", def.description, def.details));
        }
    }
}

impl eframe::App for ProcessApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sim.poll();

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(290.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.draw_controls(ui);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_process(ui);
        });

        ctx.request_repaint();
    }
}

fn fluid_color(step: ProcessStep) -> Color32 {
    match step {
        ProcessStep::Idle | ProcessStep::Crushing => COLD,
        ProcessStep::Feeding => PREHEAT,
        ProcessStep::Reaction | ProcessStep::Linkage => HOT,
        ProcessStep::Flashing => DISCHARGE,
        ProcessStep::Filtration => COLD,
    }
}

/// `mm:ss`, minutes keep growing past an hour.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_formatted_as_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(3_600), "60:00");
    }

    #[test]
    fn hot_steps_are_red() {
        assert_eq!(fluid_color(ProcessStep::Linkage), HOT);
        assert_eq!(fluid_color(ProcessStep::Idle), COLD);
    }
}
