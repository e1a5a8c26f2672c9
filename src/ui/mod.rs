use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use gpui::{
    AnyElement, App, AppContext, Bounds, Context, FocusHandle, FontWeight, InteractiveElement,
    IntoElement, KeyDownEvent, ParentElement, Render, RenderImage, Styled, TitlebarOptions, Window,
    WindowBounds, WindowOptions, div, img, px, size,
};
use gpui_component::{Root, v_flex};

use crate::types::{CompositedFrame, OverlayStyle, TextOverlay};

mod render_util;

use render_util::frame_to_image;

const QUIT_KEY: &str = "q";

pub fn launch_ui(
    app: &mut App,
    frame_rx: Receiver<CompositedFrame>,
    quit_tx: Sender<()>,
    initial_size: (u32, u32),
) -> gpui::Result<()> {
    let (width, height) = initial_size;
    let bounds = Bounds::centered(None, size(px(width as f32), px(height as f32)), app);
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Meme Mirror".into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        window_bounds: Some(WindowBounds::Windowed(bounds)),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| MirrorView::new(frame_rx, quit_tx, cx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

/// Geometry and text of the frame currently on screen.
struct Shown {
    width: u32,
    height: u32,
    camera_width: u32,
    overlays: Vec<TextOverlay>,
}

struct MirrorView {
    frame_rx: Receiver<CompositedFrame>,
    quit_tx: Sender<()>,
    focus_handle: FocusHandle,
    latest_image: Option<Arc<RenderImage>>,
    shown: Option<Shown>,
    quit_sent: bool,
}

impl MirrorView {
    fn new(
        frame_rx: Receiver<CompositedFrame>,
        quit_tx: Sender<()>,
        cx: &mut Context<'_, Self>,
    ) -> Self {
        Self {
            frame_rx,
            quit_tx,
            focus_handle: cx.focus_handle(),
            latest_image: None,
            shown: None,
            quit_sent: false,
        }
    }

    fn poll_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let mut latest = None;
        loop {
            match self.frame_rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::info!("capture session ended, closing window");
                    cx.quit();
                    break;
                }
            }
        }

        let Some(composed) = latest else {
            return;
        };
        if let Some(image) = frame_to_image(&composed.frame) {
            self.replace_latest_image(image, window, cx);
        }
        self.shown = Some(Shown {
            width: composed.frame.width,
            height: composed.frame.height,
            camera_width: composed.camera_width,
            overlays: composed.overlays,
        });
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            cx.drop_image(old_image, Some(window));
        }
    }

    fn on_key_down(
        &mut self,
        event: &KeyDownEvent,
        _window: &mut Window,
        _cx: &mut Context<'_, Self>,
    ) {
        if event.keystroke.key.eq_ignore_ascii_case(QUIT_KEY) {
            self.request_quit();
        }
    }

    fn request_quit(&mut self) {
        if self.quit_sent {
            return;
        }
        log::info!("quit requested");
        if self.quit_tx.send(()).is_err() {
            log::debug!("capture session already stopped");
        }
        self.quit_sent = true;
    }
}

fn overlay_element(overlay: &TextOverlay, shown: &Shown) -> AnyElement {
    let color = gpui::rgb(overlay.color);
    let text = overlay.text.clone();

    match overlay.style {
        OverlayStyle::Caption => div()
            .absolute()
            .left(px(shown.camera_width as f32))
            .top(px(0.0))
            .w(px(shown.width.saturating_sub(shown.camera_width) as f32))
            .h(px(shown.height as f32))
            .flex()
            .items_center()
            .justify_center()
            .text_3xl()
            .font_weight(FontWeight::BOLD)
            .text_color(color)
            .child(text)
            .into_any_element(),
        style => {
            let positioned = div()
                .absolute()
                .left(px(overlay.x))
                .top(px(overlay.y))
                .text_color(color);
            let sized = match style {
                OverlayStyle::Label => positioned.text_xl().font_weight(FontWeight::BOLD),
                OverlayStyle::Hint => positioned.text_sm(),
                _ => positioned.text_xs(),
            };
            sized.child(text).into_any_element()
        }
    }
}

impl Render for MirrorView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        if !self.focus_handle.is_focused(window) {
            window.focus(&self.focus_handle);
        }
        self.poll_frames(window, cx);

        let canvas: AnyElement = match (&self.latest_image, &self.shown) {
            (Some(image), Some(shown)) => div()
                .relative()
                .w(px(shown.width as f32))
                .h(px(shown.height as f32))
                .child(img(image.clone()).size_full())
                .children(
                    shown
                        .overlays
                        .iter()
                        .map(|overlay| overlay_element(overlay, shown)),
                )
                .into_any_element(),
            _ => div()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Waiting for camera...")
                .into_any_element(),
        };

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(gpui::rgb(0x000000))
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::on_key_down))
            .child(canvas)
    }
}
