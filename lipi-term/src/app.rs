//! Main application logic.
//!
//! Runs the single-threaded frame loop: poll the PTY (short timeout),
//! parse and apply the output, flush queued responses and keystrokes
//! back to the shell, and repaint at most every 16 ms. Only the PTY poll
//! may block.

use std::rc::Rc;
use std::time::{Duration, Instant};

use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, Ime, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};
use winit::window::{Window, WindowBuilder};

use lipi_pty::{Child, ChildBuilder, PtySize, EOT};

use crate::config::Config;
use crate::input::{self, Key, Modifiers};
use crate::renderer::Renderer;
use crate::terminal::Terminal;

const RENDER_INTERVAL: Duration = Duration::from_millis(16);

pub struct App {
    config: Config,
    window: Option<Rc<Window>>,
    renderer: Option<Renderer>,
    terminal: Terminal,
    child: Child,
    modifiers: ModifiersState,
    needs_redraw: bool,
    last_render: Instant,
}

impl App {
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let (cols, rows) = config.dimensions;

        let builder = match config.shell {
            Some(ref shell) => ChildBuilder::new(shell)?,
            None => ChildBuilder::default_shell()?,
        };
        let child = builder.size(PtySize::new(rows, cols)).spawn()?;

        Ok(Self {
            terminal: Terminal::new(rows as usize, cols as usize),
            config,
            window: None,
            renderer: None,
            child,
            modifiers: ModifiersState::empty(),
            needs_redraw: true,
            last_render: Instant::now(),
        })
    }

    pub fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let event_loop = EventLoop::new()?;

        let window = WindowBuilder::new()
            .with_title("lipi")
            .with_inner_size(LogicalSize::new(800.0, 600.0))
            .build(&event_loop)?;
        window.set_ime_allowed(true);
        let window = Rc::new(window);

        match Renderer::new(
            window.clone(),
            self.config.font_size,
            self.config.font_path.as_deref(),
            self.config.colors(),
        ) {
            Ok(renderer) => {
                let size = window.inner_size();
                let (rows, cols) = renderer.calc_dimensions(size.width, size.height);
                self.apply_resize(rows, cols);
                self.renderer = Some(renderer);
            }
            Err(e) => {
                log::warn!("no renderer, running headless: {}", e);
            }
        }
        self.window = Some(window);

        event_loop.run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => self.handle_window_event(event, elwt),
                Event::AboutToWait => self.tick(elwt),
                _ => {}
            }
        })?;

        Ok(())
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                    let (rows, cols) = renderer.calc_dimensions(size.width, size.height);
                    self.apply_resize(rows, cols);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(&event);
            }
            WindowEvent::Ime(ime) => self.handle_ime(ime),
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    /// One frame: drain PTY output, forward replies, schedule a repaint
    fn tick(&mut self, elwt: &EventLoopWindowTarget<()>) {
        match self.child.poll_output() {
            Ok(chunk) if !chunk.is_empty() => {
                self.terminal.process(&chunk);
                if chunk.len() == 1 && chunk[0] == EOT {
                    log::info!("shell closed the PTY");
                }
                self.needs_redraw = true;
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("PTY read error: {}", e);
                elwt.exit();
                return;
            }
        }

        for response in self.terminal.take_pending_responses() {
            if let Err(e) = self.child.write_all(&response) {
                log::error!("failed to write response: {}", e);
            }
        }

        if self.terminal.is_exited() {
            elwt.exit();
            return;
        }
        if let Some(code) = self.child.try_wait() {
            log::info!("shell exited with status {}", code);
            elwt.exit();
            return;
        }

        if self.needs_redraw && self.last_render.elapsed() >= RENDER_INTERVAL {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn render(&mut self) {
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.render(&self.terminal) {
                log::error!("render failed: {}", e);
            }
        }
        self.needs_redraw = false;
        self.last_render = Instant::now();
    }

    fn apply_resize(&mut self, rows: usize, cols: usize) {
        if rows == self.terminal.screen().rows() && cols == self.terminal.screen().cols() {
            return;
        }
        self.terminal.resize(rows, cols);
        if let Err(e) = self.child.resize(PtySize::new(rows as u16, cols as u16)) {
            log::warn!("PTY resize failed: {}", e);
        }
        self.needs_redraw = true;
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }

        let mods = Modifiers {
            shift: self.modifiers.shift_key(),
            ctrl: self.modifiers.control_key(),
            alt: self.modifiers.alt_key(),
        };

        // Shift+scroll keys navigate the local scrollback and send nothing
        if mods.shift {
            let handled = match event.logical_key {
                WinitKey::Named(NamedKey::ArrowUp) => {
                    self.terminal.scroll_line_up();
                    true
                }
                WinitKey::Named(NamedKey::ArrowDown) => {
                    self.terminal.scroll_line_down();
                    true
                }
                WinitKey::Named(NamedKey::PageUp) => {
                    self.terminal.scroll_page_up();
                    true
                }
                WinitKey::Named(NamedKey::PageDown) => {
                    self.terminal.scroll_page_down();
                    true
                }
                _ => false,
            };
            if handled {
                self.needs_redraw = true;
                return;
            }
        }

        let key = match &event.logical_key {
            WinitKey::Named(named) => match named {
                NamedKey::Enter => Key::Enter,
                NamedKey::Tab => Key::Tab,
                NamedKey::Backspace => Key::Backspace,
                NamedKey::Escape => Key::Escape,
                NamedKey::ArrowUp => Key::Up,
                NamedKey::ArrowDown => Key::Down,
                NamedKey::ArrowLeft => Key::Left,
                NamedKey::ArrowRight => Key::Right,
                NamedKey::Home => Key::Home,
                NamedKey::End => Key::End,
                NamedKey::PageUp => Key::PageUp,
                NamedKey::PageDown => Key::PageDown,
                NamedKey::Insert => Key::Insert,
                NamedKey::Delete => Key::Delete,
                NamedKey::Space => Key::Char(' '),
                NamedKey::F1 => Key::F(1),
                NamedKey::F2 => Key::F(2),
                NamedKey::F3 => Key::F(3),
                NamedKey::F4 => Key::F(4),
                NamedKey::F5 => Key::F(5),
                NamedKey::F6 => Key::F(6),
                NamedKey::F7 => Key::F(7),
                NamedKey::F8 => Key::F(8),
                NamedKey::F9 => Key::F(9),
                NamedKey::F10 => Key::F(10),
                NamedKey::F11 => Key::F(11),
                NamedKey::F12 => Key::F(12),
                _ => return,
            },
            WinitKey::Character(text) => match text.chars().next() {
                Some(c) => Key::Char(c),
                None => return,
            },
            _ => return,
        };

        let bytes = input::encode_key(key, mods, self.terminal.app_cursor_keys());
        if !bytes.is_empty() {
            if let Err(e) = self.child.write_all(&bytes) {
                log::error!("failed to send input: {}", e);
            }
        }
    }

    fn handle_ime(&mut self, ime: Ime) {
        match ime {
            Ime::Preedit(text, cursor) => {
                let cursor = cursor.map(|(begin, _)| begin).unwrap_or(text.len());
                self.terminal.set_preedit(&text, cursor);
                self.needs_redraw = true;
            }
            Ime::Commit(text) => {
                if let Err(e) = self.child.write_all(text.as_bytes()) {
                    log::error!("failed to send committed text: {}", e);
                }
                self.terminal.clear_preedit();
                self.needs_redraw = true;
            }
            Ime::Enabled | Ime::Disabled => {}
        }
    }
}
