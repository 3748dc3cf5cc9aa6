#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::PathBuf;
use std::sync::mpsc;

use eframe::egui;

use exif_sweep::config::Config;
use exif_sweep::pipeline::{BatchSummary, FileOutcome, FileStatus};
use exif_sweep::sweeper::MetadataState;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([900.0, 600.0])
        .with_min_inner_size([640.0, 400.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "exif-sweep",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}

// ── Messages sent from the worker thread to the UI ──────────────────

enum BgMessage {
    /// The batch finished; carries every per-file outcome.
    BatchDone(Vec<FileOutcome>),
    /// The batch could not run at all.
    Error(String),
}

/// Hand a worker result to the UI. Returns false when the window is
/// already gone and nobody is listening.
fn deliver(tx: &mpsc::Sender<BgMessage>, msg: BgMessage) -> bool {
    match tx.send(msg) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Batch result not delivered, window closed: {e}");
            false
        }
    }
}

// ── Tabs ────────────────────────────────────────────────────────────

#[derive(PartialEq, Clone, Copy)]
enum Tab {
    Sweep,
    Settings,
}

// ── Main application state ──────────────────────────────────────────

struct App {
    config: Config,
    config_path: Option<PathBuf>,
    /// Preserve list as edited in the settings tab, one tag per line.
    preserve_text: String,
    outcomes: Vec<FileOutcome>,
    selected: Option<usize>,
    tab: Tab,
    processing: bool,
    status: String,
    rx: mpsc::Receiver<BgMessage>,
    tx: mpsc::Sender<BgMessage>,
}

const READY: &str = "Select input and output folders";

impl App {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (tx, rx) = mpsc::channel();
        let config = Config::load(None).unwrap_or_else(|e| {
            log::warn!("Failed to load config: {e:#}. Using defaults.");
            Config::default()
        });
        let preserve_text = config.preserve.tags.join("\n");

        Self {
            config,
            config_path: None,
            preserve_text,
            outcomes: Vec::new(),
            selected: None,
            tab: Tab::Sweep,
            processing: false,
            status: READY.into(),
            rx,
            tx,
        }
    }

    fn select_input_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.status = format!("Input: {}", dir.display());
            self.config.folders.input = Some(dir);
        }
    }

    fn select_output_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.status = format!("Output: {}", dir.display());
            self.config.folders.output = Some(dir);
        }
    }

    fn sync_preserve_list(&mut self) {
        self.config.preserve.tags = self
            .preserve_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
    }

    fn start_sweep(&mut self, dry_run: bool) {
        if self.processing {
            return;
        }
        self.sync_preserve_list();

        let mut config = self.config.clone();
        config.output.dry_run |= dry_run;

        // Folder check happens here, before any file is touched.
        let pipeline = match config.pipeline() {
            Ok(p) => p,
            Err(e) => {
                self.status = e.to_string();
                return;
            }
        };

        self.processing = true;
        self.outcomes.clear();
        self.selected = None;
        self.status = "Removing metadata...".into();

        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let msg = match pipeline.run() {
                Ok(outcomes) => BgMessage::BatchDone(outcomes),
                Err(e) => BgMessage::Error(e.to_string()),
            };
            deliver(&tx, msg);
        });
    }

    fn poll_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.processing = false;
            match msg {
                BgMessage::BatchDone(outcomes) => {
                    self.status = BatchSummary::from(&outcomes).to_string();
                    self.selected = (!outcomes.is_empty()).then_some(0);
                    self.outcomes = outcomes;
                }
                BgMessage::Error(msg) => {
                    self.status = format!("Error: {msg}");
                }
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_messages();

        // Request repaint while processing so we pick up messages
        if self.processing {
            ctx.request_repaint();
        }

        // A dropped folder becomes the input folder
        let dropped: Option<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .find(|p| p.is_dir())
        });
        if let Some(dir) = dropped {
            self.status = format!("Input: {}", dir.display());
            self.config.folders.input = Some(dir);
        }

        // ── Top bar ─────────────────────────────────────────────────
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("exif-sweep");
                ui.separator();

                if ui.selectable_label(self.tab == Tab::Sweep, "🧹 Sweep").clicked() {
                    self.tab = Tab::Sweep;
                }
                if ui.selectable_label(self.tab == Tab::Settings, "⚙ Settings").clicked() {
                    self.tab = Tab::Settings;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.processing {
                        ui.spinner();
                    }
                });
            });
        });

        match self.tab {
            Tab::Sweep => self.show_sweep_tab(ctx),
            Tab::Settings => self.show_settings_tab(ctx),
        }
    }
}

// ── Sweep tab ───────────────────────────────────────────────────────

fn folder_label(dir: &Option<PathBuf>) -> String {
    dir.as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(not set)".into())
}

impl App {
    fn show_sweep_tab(&mut self, ctx: &egui::Context) {
        // ── Bottom toolbar ──────────────────────────────────────────
        egui::TopBottomPanel::bottom("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.add_enabled(!self.processing, egui::Button::new("📁 Select Input Folder")).clicked() {
                    self.select_input_folder();
                }
                if ui.add_enabled(!self.processing, egui::Button::new("📁 Select Output Folder")).clicked() {
                    self.select_output_folder();
                }
                ui.separator();

                if ui.add_enabled(!self.processing, egui::Button::new("▶ Remove Metadata")).clicked() {
                    self.start_sweep(false);
                }
                if ui.add_enabled(!self.processing, egui::Button::new("👁 Dry Run")).clicked() {
                    self.start_sweep(true);
                }
            });
            ui.add_space(2.0);
            ui.label(&self.status);
            ui.add_space(4.0);
        });

        // ── Left panel: file list ───────────────────────────────────
        egui::SidePanel::left("file_list")
            .default_width(260.0)
            .min_width(180.0)
            .show(ctx, |ui| {
                egui::Grid::new("folders_grid")
                    .num_columns(2)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("Input").strong());
                        ui.label(folder_label(&self.config.folders.input));
                        ui.end_row();
                        ui.label(egui::RichText::new("Output").strong());
                        ui.label(folder_label(&self.config.folders.output));
                        ui.end_row();
                    });
                ui.separator();

                if self.outcomes.is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.label(egui::RichText::new("Drop a folder here\nor select one below")
                            .size(16.0)
                            .color(egui::Color32::GRAY));
                    });
                    return;
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    let mut new_selected = self.selected;
                    for (i, outcome) in self.outcomes.iter().enumerate() {
                        let filename = outcome.path.file_name()
                            .map(|f| f.to_string_lossy().to_string())
                            .unwrap_or_else(|| outcome.path.display().to_string());

                        let status_icon = match &outcome.status {
                            FileStatus::Swept { .. } => "✅ ",
                            FileStatus::Skipped => "⏭ ",
                            FileStatus::Failed { .. } => "❌ ",
                        };

                        let label = format!("{status_icon}{filename}");
                        if ui.selectable_label(self.selected == Some(i), label).clicked() {
                            new_selected = Some(i);
                        }
                    }
                    self.selected = new_selected;
                });
            });

        // ── Central panel: per-file detail ──────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(outcome) = self.selected.and_then(|i| self.outcomes.get(i)) else {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("Results appear here after a run")
                        .size(18.0)
                        .color(egui::Color32::GRAY));
                });
                return;
            };

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| Self::show_outcome(ui, outcome));
        });
    }

    fn show_outcome(ui: &mut egui::Ui, outcome: &FileOutcome) {
        ui.heading(outcome.path.file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default());
        ui.label(format!("Path: {}", outcome.path.display()));
        if let Some(ref output) = outcome.output {
            ui.label(format!("Written to: {}", output.display()));
        }
        ui.add_space(8.0);
        ui.separator();

        let report = match &outcome.status {
            FileStatus::Swept { report } => report,
            FileStatus::Skipped => {
                ui.colored_label(egui::Color32::GRAY, "Skipped: not a recognized image file.");
                return;
            }
            FileStatus::Failed { error } => {
                ui.colored_label(egui::Color32::from_rgb(220, 50, 50), format!("Error: {error}"));
                return;
            }
        };

        match report.metadata {
            MetadataState::Absent => {
                ui.label("No EXIF metadata found.");
                return;
            }
            MetadataState::Unparseable => {
                ui.colored_label(
                    egui::Color32::from_rgb(180, 180, 50),
                    "EXIF block could not be read and was dropped.",
                );
                return;
            }
            MetadataState::Swept => {}
        }

        ui.label(format!(
            "{} removed, {} kept",
            report.removed().count(),
            report.kept().count()
        ));
        ui.add_space(8.0);

        egui::Grid::new("decisions_grid")
            .num_columns(4)
            .striped(true)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                for heading in ["IFD", "Tag", "Name", ""] {
                    ui.label(egui::RichText::new(heading).strong());
                }
                ui.end_row();

                for decision in &report.decisions {
                    ui.label(decision.ifd.name());
                    ui.monospace(format!("{:#06x}", decision.tag));
                    ui.label(&decision.name);
                    if decision.kept {
                        ui.colored_label(egui::Color32::from_rgb(50, 180, 50), "kept");
                    } else {
                        ui.colored_label(egui::Color32::from_rgb(220, 50, 50), "removed");
                    }
                    ui.end_row();
                }
            });
    }
}

// ── Settings tab ────────────────────────────────────────────────────

impl App {
    fn show_settings_tab(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Configuration");
                ui.add_space(8.0);

                // Config file path
                ui.horizontal(|ui| {
                    ui.label("Config file:");
                    if let Some(ref path) = self.config_path {
                        ui.label(path.display().to_string());
                    } else {
                        ui.label("(default)");
                    }
                    if ui.button("Load...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .pick_file()
                        {
                            match Config::load(Some(&path)) {
                                Ok(c) => {
                                    self.preserve_text = c.preserve.tags.join("\n");
                                    self.config = c;
                                    self.config_path = Some(path);
                                    self.status = "Config loaded".into();
                                }
                                Err(e) => {
                                    self.status = format!("Failed to load config: {e}");
                                }
                            }
                        }
                    }
                    if ui.button("Save").clicked() {
                        self.sync_preserve_list();
                        let path = self.config_path.as_deref();
                        match self.config.save(path) {
                            Ok(()) => self.status = "Config saved".into(),
                            Err(e) => self.status = format!("Failed to save config: {e}"),
                        }
                    }
                });

                ui.add_space(16.0);
                ui.separator();

                // ── Preserved tags ──────────────────────────────────
                ui.add_space(8.0);
                ui.heading("Preserved tags");
                ui.label(
                    egui::RichText::new("One tag name or hex id (e.g. 0x0112) per line. Everything else is removed.")
                        .small()
                        .color(egui::Color32::GRAY),
                );
                ui.add_space(4.0);
                ui.add(
                    egui::TextEdit::multiline(&mut self.preserve_text)
                        .desired_rows(12)
                        .code_editor(),
                );
                if ui.button("Reset to defaults").clicked() {
                    self.preserve_text = Config::default().preserve.tags.join("\n");
                }

                ui.add_space(16.0);
                ui.separator();

                // ── Output ──────────────────────────────────────────
                ui.add_space(8.0);
                ui.heading("Output");
                ui.add_space(4.0);

                ui.checkbox(&mut self.config.output.dry_run, "Dry run (report only, write nothing)");
            });
        });
    }
}
