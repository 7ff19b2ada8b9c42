//! Outrun Race entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{DeviceOrientationEvent, KeyboardEvent};

    use outrun_race::consts::*;
    use outrun_race::format_elapsed;
    use outrun_race::settings::Settings;
    use outrun_race::sim::{
        GameAction, GameEvent, GameState, Gyroscope, JumpButton, RapierWorld, RunPhase,
        TickInput, tick,
    };

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        gyro: Gyroscope,
        jump_button: JumpButton,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, settings: Settings, width: f32, has_touch: bool) -> Self {
            let config = settings.game_config(width, has_touch);
            let gyro = Gyroscope::new(config.tilt);
            Self {
                state: GameState::with_world(RapierWorld::new(), config, seed),
                settings,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                gyro,
                jump_button: JumpButton::default(),
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut self.state, &self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }

            for event in self.state.store.drain_events() {
                match event {
                    GameEvent::LevelGenerated { seed, .. } => {
                        log::debug!("Level ready (seed {})", seed);
                    }
                    GameEvent::PhaseChanged { to: RunPhase::Ready, .. } => {
                        // A new run on a phone starts from wherever it is held now
                        self.gyro.recalibrate();
                    }
                    _ => {}
                }
            }
        }

        fn key(&mut self, code: &str, pressed: bool) -> bool {
            self.input.keys.set_key(code, pressed)
        }

        fn orientation(&mut self, beta: f32, gamma: f32) {
            if let Some(controls) = self.gyro.read(beta, gamma) {
                self.state.dispatch(GameAction::SetMobileControls(controls));
            }
        }

        fn jump_tap(&mut self, wall_ms: f64) {
            if self.jump_button.press(wall_ms) {
                let now_ms = self.state.now_ms();
                self.state.dispatch(GameAction::MobileJump { now_ms });
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            if let Some(el) = document.get_element_by_id("time") {
                el.set_text_content(Some(&format_elapsed(self.state.elapsed_ms())));
            }

            // Restart prompt only after the finish
            if let Some(el) = document.get_element_by_id("restart") {
                let hidden = self.state.phase() != RunPhase::Ended;
                let _ = el.class_list().toggle_with_force("hidden", hidden);
            }

            // Key indicators
            let keys = self.input.keys;
            for (id, active) in [
                ("key-forward", keys.forward),
                ("key-backward", keys.backward),
                ("key-leftward", keys.leftward),
                ("key-rightward", keys.rightward),
                ("key-jump", keys.jump),
            ] {
                if let Some(el) = document.get_element_by_id(id) {
                    let _ = el.class_list().toggle_with_force("active", active);
                }
            }

            if let Some(el) = document.get_element_by_id("hud-fps") {
                let _ = el.class_list().toggle_with_force("hidden", !self.settings.show_fps);
                el.set_text_content(Some(&self.fps.to_string()));
            }
        }
    }

    fn viewport() -> (f32, bool) {
        let Some(window) = web_sys::window() else {
            return (0.0, false);
        };
        let width = window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0) as f32;
        let has_touch = window.navigator().max_touch_points() > 0;
        (width, has_touch)
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger unavailable: {}", e).into());
        }

        log::info!("Outrun Race starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document, nothing to attach to");
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let (width, has_touch) = viewport();
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, settings, width, has_touch)));

        log::info!(
            "Game initialized with seed: {} ({}px, touch: {})",
            seed,
            width,
            has_touch
        );

        setup_keyboard(game.clone());
        setup_orientation(game.clone());
        setup_buttons(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        request_animation_frame(game);

        log::info!("Outrun Race running!");
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let code = event.code();
                if game.borrow_mut().key(&code, pressed) {
                    // Keep arrows and space from scrolling the page
                    event.prevent_default();
                }
            });
            let _ = window
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Dropping focus would leave keys stuck down
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
            game.borrow_mut().input = TickInput::default();
            log::debug!("Window blur, keys released");
        });
        let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_orientation(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |event: DeviceOrientationEvent| {
            // Missing axes read as level
            let beta = event.beta().unwrap_or(0.0) as f32;
            let gamma = event.gamma().unwrap_or(0.0) as f32;
            game.borrow_mut().orientation(beta, gamma);
        });
        let _ = window
            .add_event_listener_with_callback("deviceorientation", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().state.restart();
                log::info!("Restart requested");
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("jump-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::TouchEvent| {
                game.borrow_mut().jump_tap(js_sys::Date::now());
            });
            let _ = btn
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("recalibrate-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().gyro.recalibrate();
                log::info!("Gyroscope recalibrated");
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Outrun Race (native) starting...");
    log::info!("Native mode runs a headless demo - run with `trunk serve` for the web version");

    headless_run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Hold forward down a short corridor and report how the run went
#[cfg(not(target_arch = "wasm32"))]
fn headless_run() {
    use outrun_race::consts::*;
    use outrun_race::format_elapsed;
    use outrun_race::settings::Settings;
    use outrun_race::sim::{
        BoostEvent, GameAction, GameState, KeyboardState, RapierWorld, RunPhase, TickInput, tick,
    };

    let mut settings = Settings::load();
    settings.obstacle_count = 3;
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7);
    let mut state = GameState::with_world(RapierWorld::new(), settings.game_config(1280.0, false), seed);

    let input = TickInput {
        keys: KeyboardState {
            forward: true,
            ..Default::default()
        },
    };

    // 60 Hz frames through the same accumulator the web loop uses
    let frame_dt = 1.0 / 60.0;
    let mut accumulator = 0.0;
    let mut boosted = false;
    for _frame in 0..60 * 60 {
        accumulator += frame_dt;
        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        if !boosted && state.elapsed_ms() > 1000.0 {
            let now_ms = state.now_ms();
            state.dispatch(GameAction::Boost {
                event: BoostEvent::new(2.0, 1000),
                now_ms,
            });
            boosted = true;
        }

        for event in state.store.drain_events() {
            log::debug!("{:?}", event);
        }

        if state.phase() == RunPhase::Ended {
            break;
        }
    }

    let position = state.player.position(&state.world);
    println!(
        "Seed {}: {} at z={:.2} after {}s",
        seed,
        state.phase().as_str(),
        position.z,
        format_elapsed(state.elapsed_ms())
    );
}
