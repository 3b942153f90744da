const COMMANDS: &[&str] = &[
    "content_ready",
    "navigate",
    "close_window",
    "get_settings",
    "pick_custom_background",
    "clear_custom_background",
    "list_windows",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
