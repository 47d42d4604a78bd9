use gpui::*;
use gpui_component::Root;
use gpui_richbar::RichbarEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let app = Application::new();

    app.run(move |cx| {
        gpui_component::init(cx);
        gpui_richbar::init(cx);
        cx.activate(true);

        cx.spawn(async move |cx| {
            cx.open_window(
                WindowOptions {
                    titlebar: Some(TitlebarOptions {
                        title: Some("Richbar".into()),
                        appears_transparent: false,
                        traffic_light_position: None,
                    }),
                    ..Default::default()
                },
                |window, cx| {
                    let view = RichbarEditor::view(window, cx);
                    cx.new(|cx| Root::new(view, window, cx))
                },
            )?;

            tracing::info!("richbar window opened");
            Ok::<_, anyhow::Error>(())
        })
        .detach();
    });
}
