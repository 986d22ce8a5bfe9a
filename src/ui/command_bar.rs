use crate::app::{ConsoleApp, ZoomAll};
use crate::ui::theme;
use crew_timeline::model::TimelineKind;
use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

const COMMAND_HINT: &str = "e.g.  c 1234  |  2/ dp IST  |  /t t 88  |  d 2024-03-01 2024-03-31";

/// Render the menu bar and the global command line.
pub fn show_command_bar(app: &mut ConsoleApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_header()), |ui| {
            if ui
                .button(format!("{}  Open Dataset...", icons::FOLDER_OPEN))
                .clicked()
            {
                app.open_dataset(ui.ctx());
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Save Settings").clicked() {
                app.save_settings();
                ui.close_menu();
            }
            if ui.button("  Open Settings Folder").clicked() {
                app.open_settings_folder();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Timelines  ").font(theme::font_header()), |ui| {
            for kind in [TimelineKind::Roster, TimelineKind::Trip, TimelineKind::Rotation] {
                if ui
                    .button(format!("{}  New {} Timeline", icons::PLUS, kind.label()))
                    .clicked()
                {
                    app.new_timeline(kind);
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button("  Reset All").clicked() {
                app.session.timelines.reset_all_timelines();
                app.status_message = "All timelines reset".to_string();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_header()), |ui| {
            if ui.button("  Zoom In All").clicked() {
                app.zoom_all(ZoomAll::In);
                ui.close_menu();
            }
            if ui.button("  Zoom Out All").clicked() {
                app.zoom_all(ZoomAll::Out);
                ui.close_menu();
            }
            if ui.button("  Reset Zoom").clicked() {
                app.zoom_all(ZoomAll::Reset);
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Notices", icons::BELL)).clicked() {
                app.show_notices = true;
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_header()), |ui| {
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });
    });

    ui.horizontal(|ui| {
        ui.label(RichText::new(icons::MAGNIFYING_GLASS).color(theme::TEXT_SECONDARY));
        let input = ui.add_sized(
            [ui.available_width() - 90.0, 24.0],
            egui::TextEdit::singleline(&mut app.command_text)
                .hint_text(COMMAND_HINT)
                .text_color(theme::TEXT_PRIMARY),
        );
        let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        let clicked = ui.add_sized([80.0, 24.0], egui::Button::new("Search")).clicked();
        if submitted || clicked {
            app.submit_command(ui.ctx());
        }
    });
    ui.add_space(2.0);
}
