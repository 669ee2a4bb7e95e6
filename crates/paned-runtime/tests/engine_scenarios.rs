//! End-to-end engine behaviour: windows, dispatch, nested reads, signals and
//! the reactor, driven through queued input on a headless surface.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::rc::Rc;
use std::thread;

use paned_core::{HeadlessSurface, InputEvent, Keymap, Line, Rect};
use paned_layout::WindowState;
use paned_runtime::{
    Action, ActionError, Buffer, BufferSpec, ConsoleBuffer, Engine, EngineConfig, EngineError,
    Lines, LogBuffer, RenderContext, SessionLog, Signal,
};

fn engine() -> Engine {
    Engine::new(EngineConfig::default(), HeadlessSurface::new(25, 80)).unwrap()
}

fn press(engine: &mut Engine, keys: &str) {
    engine.feed_keys(keys).unwrap();
    engine.drain_input();
}

/// Record every value an action reads into `sink`.
fn reader(name: &str, sink: Rc<RefCell<Vec<String>>>, read: fn(&mut Engine) -> Result<String, ActionError>) -> Action {
    Action::new(name, move |engine: &mut Engine| {
        let value = read(engine)?;
        sink.borrow_mut().push(value);
        Ok(Signal::Continue)
    })
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

#[test]
fn split_then_delete_restores_the_single_window() {
    let mut engine = engine();
    let buffer = engine.current_buffer().unwrap();
    let original = engine.selected_window().unwrap().id();

    press(&mut engine, "C-x 2");
    let set = engine.windows().active();
    assert_eq!(set.window_count(), 2);
    assert_ne!(set.selected_window_id(), original);
    let rects: Vec<Rect> = set.windows().map(|w| w.rect()).collect();
    assert_eq!(rects[0], Rect::new(0, 0, 80, 12));
    assert_eq!(rects[1], Rect::new(0, 12, 80, 12));
    assert!(set.windows().all(|w| w.buffer() == buffer));
    assert!(set.windows().all(|w| w.content_rows() == 11));

    press(&mut engine, "C-x 0");
    let set = engine.windows().active();
    assert_eq!(set.window_count(), 1);
    let window = engine.selected_window().unwrap();
    assert_eq!(window.id(), original);
    assert_eq!(window.rect(), Rect::from_size(80, 24));
    assert_eq!(window.buffer(), buffer);
}

#[test]
fn splitting_selects_the_new_window() {
    let mut engine = engine();
    let original = engine.selected_window().unwrap().id();

    press(&mut engine, "C-x 3");
    let new = engine.selected_window().unwrap();
    assert_ne!(new.id(), original);
    assert_eq!(new.rect(), Rect::new(41, 0, 39, 24));

    press(&mut engine, "C-x 2");
    let newest = engine.selected_window().unwrap();
    assert_eq!(newest.rect(), Rect::new(41, 12, 39, 12));
    assert_eq!(engine.windows().active().window_count(), 3);
}

#[test]
fn deleting_the_last_window_is_refused_with_a_message() {
    let mut engine = engine();
    press(&mut engine, "C-x 0");
    assert_eq!(engine.last_message(), Some("Can not delete last window."));
    assert_eq!(engine.windows().active().window_count(), 1);
}

#[test]
fn the_first_window_set_survives_deletion() {
    let mut engine = engine();
    press(&mut engine, "C-x 5 0");
    assert_eq!(engine.last_message(), Some("Can not delete window set 1."));

    press(&mut engine, "C-x 5 2");
    assert_eq!(engine.windows().len(), 2);
    assert_eq!(engine.windows().active_index(), 1);

    press(&mut engine, "C-x 5 0");
    assert_eq!(engine.windows().len(), 1);
    assert_eq!(engine.windows().active_index(), 0);
}

#[test]
fn resize_events_relayout_every_window() {
    let surface = Rc::new(RefCell::new(HeadlessSurface::new(25, 80)));
    let mut engine = Engine::new(EngineConfig::default(), Rc::clone(&surface)).unwrap();
    engine.split_right().unwrap();

    surface.borrow_mut().set_dimensions(41, 120);
    engine.push_input(InputEvent::Resize);
    engine.drain_input();

    let set = engine.windows().active();
    assert_eq!(set.area(), Rect::from_size(120, 40));
    let widths: u16 = set.windows().map(|w| w.rect().width).sum();
    // One column goes to the divider.
    assert_eq!(widths + 1, 120);
    assert!(set.windows().all(|w| w.rect().height == 40));
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// A buffer with bindings of its own.
struct Scratch {
    name: String,
    keymap: Keymap<Action>,
}

impl Buffer for Scratch {
    fn name(&self) -> &str {
        &self.name
    }

    fn line_count(&self, _ctx: &RenderContext<'_>) -> usize {
        0
    }

    fn lines<'a>(&'a self, _first: usize, _view: &'a WindowState, _ctx: &'a RenderContext<'a>) -> Lines<'a> {
        Box::new(std::iter::empty::<Line>())
    }

    fn keymap(&self) -> Option<&Keymap<Action>> {
        Some(&self.keymap)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BufferSpec for Scratch {
    type Args = String;

    fn create(name: &String, _session_log: &SessionLog) -> Self {
        let mut keymap = Keymap::new();
        keymap.bind_str("C-c o", tag("buffer")).unwrap();
        Self {
            name: name.clone(),
            keymap,
        }
    }
}

fn tag(label: &'static str) -> Action {
    Action::new(label, move |engine: &mut Engine| {
        engine.message(label);
        Ok(Signal::Continue)
    })
}

#[test]
fn buffer_keymap_shadows_class_which_shadows_global() {
    let mut engine = engine();
    engine.bind_global("C-c o", tag("global")).unwrap();
    engine.bind_global("C-c g", tag("global-only")).unwrap();
    engine.bind_for_class::<Scratch>("C-c o", tag("class")).unwrap();
    engine.bind_for_class::<Scratch>("C-c c", tag("class-only")).unwrap();

    press(&mut engine, "C-c o");
    assert_eq!(engine.last_message(), Some("global"));

    engine.switch_to_buffer::<Scratch>(&"scratch".to_string()).unwrap();
    press(&mut engine, "C-c o");
    assert_eq!(engine.last_message(), Some("buffer"));
    press(&mut engine, "C-c c");
    assert_eq!(engine.last_message(), Some("class-only"));
    press(&mut engine, "C-c g");
    assert_eq!(engine.last_message(), Some("global-only"));
}

#[test]
fn class_keymaps_compose_their_supers() {
    let mut engine = engine();
    let mut own = Keymap::new();
    own.bind_str("C-c a", tag("own")).unwrap();
    let mut base = Keymap::new();
    base.bind_str("C-c a", tag("base")).unwrap();
    base.bind_str("C-c b", tag("base-b")).unwrap();
    engine.register_buffer_class::<Scratch>(&own, [&base]);

    engine.switch_to_buffer::<Scratch>(&"s".to_string()).unwrap();
    press(&mut engine, "C-c a");
    assert_eq!(engine.last_message(), Some("own"));
    press(&mut engine, "C-c b");
    assert_eq!(engine.last_message(), Some("base-b"));
}

#[test]
fn unknown_chords_are_echoed_but_not_logged() {
    let mut engine = engine();
    press(&mut engine, "C-x");
    assert_eq!(engine.echo_text(), Some("C-x-"));
    press(&mut engine, "C-z");
    assert_eq!(engine.echo_text(), Some("Unknown keychord: C-x C-z"));
    assert!(engine.session_log().is_empty());

    // The pending sequence was reset; the next chord starts fresh.
    press(&mut engine, "C-x 2");
    assert_eq!(engine.windows().active().window_count(), 2);
}

#[test]
fn literal_text_goes_to_buffers_that_take_input() {
    let mut engine = engine();
    engine.feed_text("abc");
    engine.drain_input();
    assert_eq!(engine.echo_text(), Some("Unknown keychord: c"));

    let id = engine.switch_to_buffer::<ConsoleBuffer>(&"console".to_string()).unwrap();
    engine.feed_text("abc");
    engine.drain_input();
    let console = engine.buffers().get_as::<ConsoleBuffer>(id).unwrap();
    assert_eq!(console.input().text(), "abc");
}

#[test]
fn failing_and_panicking_actions_are_reported() {
    let mut engine = engine();
    engine
        .bind_global("C-c f", Action::new("fail", |_: &mut Engine| Err(ActionError::msg("boom"))))
        .unwrap();
    engine
        .bind_global("C-c p", Action::new("explode", |_: &mut Engine| panic!("kaboom")))
        .unwrap();

    press(&mut engine, "C-c f");
    assert_eq!(engine.last_message(), Some("Error in fail: boom"));
    press(&mut engine, "C-c p");
    assert_eq!(engine.last_message(), Some("Error in explode: kaboom"));

    // Still dispatching.
    press(&mut engine, "C-x 3");
    assert_eq!(engine.windows().active().window_count(), 2);
    assert_eq!(engine.frame_depth(), 1);
}

// ---------------------------------------------------------------------------
// Minibuffer reads and signals
// ---------------------------------------------------------------------------

#[test]
fn read_string_returns_the_submitted_text() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    engine
        .bind_global("C-c n", reader("ask-name", Rc::clone(&seen), |engine| {
            engine.read_string("Name: ", None)
        }))
        .unwrap();

    engine.feed_keys("C-c n").unwrap();
    engine.feed_text("bob");
    engine.feed_keys("<enter> C-x C-c").unwrap();
    engine.run().unwrap();

    assert_eq!(*seen.borrow(), vec!["bob".to_string()]);
    assert_eq!(engine.frame_depth(), 1);
}

#[test]
fn reads_nest_and_finish_innermost_first() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    engine
        .bind_global("C-c o", reader("outer", Rc::clone(&seen), |engine| {
            engine.read_string("Outer: ", None)
        }))
        .unwrap();
    engine
        .bind_global("C-c i", reader("inner", Rc::clone(&seen), |engine| {
            engine.read_string("Inner: ", None)
        }))
        .unwrap();
    let deepest = Rc::new(Cell::new(0));
    let depth = Rc::clone(&deepest);
    engine.add_update_fn(move |engine: &mut Engine| depth.set(depth.get().max(engine.frame_depth())));

    engine.feed_keys("C-c o").unwrap();
    engine.feed_text("out");
    engine.feed_keys("C-c i").unwrap();
    engine.feed_text("in");
    engine.feed_keys("<enter>").unwrap();
    engine.feed_text("er");
    engine.feed_keys("<enter> C-x C-c").unwrap();
    engine.run().unwrap();

    assert_eq!(deepest.get(), 3);
    assert_eq!(*seen.borrow(), vec!["in".to_string(), "outer".to_string()]);
}

#[test]
fn cancel_unwinds_every_read_in_the_chain() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine
        .bind_global(
            "C-c t",
            Action::new("two-step", move |engine: &mut Engine| {
                let first = engine.read_string("First: ", None)?;
                sink.borrow_mut().push(first);
                let second = engine.read_string("Second: ", None)?;
                sink.borrow_mut().push(second);
                Ok(Signal::Continue)
            }),
        )
        .unwrap();

    engine.feed_keys("C-c t").unwrap();
    engine.feed_text("a");
    engine.feed_keys("<enter>").unwrap();
    engine.feed_text("b");
    engine.feed_keys("C-g C-x C-c").unwrap();
    engine.run().unwrap();

    assert_eq!(*seen.borrow(), vec!["a".to_string()]);
    assert_eq!(engine.last_message(), Some("Cancelled."));
}

#[test]
fn cancel_from_a_nested_command_returns_to_the_top_level() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    engine
        .bind_global("C-c o", reader("outer", Rc::clone(&seen), |engine| {
            engine.read_string("Outer: ", None)
        }))
        .unwrap();
    engine
        .bind_global("C-c i", reader("inner", Rc::clone(&seen), |engine| {
            engine.read_string("Inner: ", None)
        }))
        .unwrap();
    let deepest = Rc::new(Cell::new(0));
    let depth = Rc::clone(&deepest);
    engine.add_update_fn(move |engine: &mut Engine| depth.set(depth.get().max(engine.frame_depth())));

    engine.feed_keys("C-c o").unwrap();
    engine.feed_text("out");
    engine.feed_keys("C-c i").unwrap();
    engine.feed_text("in");
    engine.feed_keys("C-g C-x C-c").unwrap();
    engine.run().unwrap();

    assert_eq!(deepest.get(), 3);
    assert!(seen.borrow().is_empty());
    assert_eq!(engine.last_message(), Some("Cancelled."));
    assert_eq!(engine.frame_depth(), 1);
}

#[test]
fn exit_during_a_read_finishes_every_frame() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    engine
        .bind_global("C-c n", reader("ask", Rc::clone(&seen), |engine| {
            engine.read_string("Name: ", None)
        }))
        .unwrap();
    let exited = Rc::new(Cell::new(false));
    let flag = Rc::clone(&exited);
    engine.add_exit_handler(move |_| flag.set(true));

    engine.feed_keys("C-c n").unwrap();
    engine.feed_text("half");
    engine.feed_keys("C-x C-c").unwrap();
    engine.run().unwrap();

    assert!(seen.borrow().is_empty());
    assert!(exited.get());
    assert_eq!(engine.frame_depth(), 1);
}

#[test]
fn read_integer_prompts_again_on_bad_input() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine
        .bind_global(
            "C-c k",
            Action::new("count", move |engine: &mut Engine| {
                let count = engine.read_integer("Count: ", None)?;
                sink.borrow_mut().push(count);
                Ok(Signal::Continue)
            }),
        )
        .unwrap();
    let complaints = Rc::new(Cell::new(0));
    let counter = Rc::clone(&complaints);
    engine.add_update_fn(move |engine: &mut Engine| {
        if engine.echo_text() == Some("Please enter an integer.") {
            counter.set(counter.get() + 1);
        }
    });

    engine.feed_keys("C-c k").unwrap();
    engine.feed_text("ten");
    engine.feed_keys("<enter> C-a C-k").unwrap();
    engine.feed_text("10");
    engine.feed_keys("<enter> C-x C-c").unwrap();
    engine.run().unwrap();

    assert_eq!(*seen.borrow(), vec![10]);
    assert!(complaints.get() > 0);
}

#[test]
fn draining_the_queue_without_an_input_source_is_an_error() {
    let mut engine = engine();
    engine.feed_keys("C-x 2").unwrap();
    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::NoInputSource));
    assert_eq!(engine.windows().active().window_count(), 2);
    assert!(!engine.is_running());
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

#[test]
fn killing_the_last_buffer_leaves_a_fresh_log() {
    let mut engine = engine();
    let original = engine.current_buffer().unwrap();
    press(&mut engine, "C-x C-k");
    let replacement = engine.current_buffer().unwrap();
    assert_ne!(replacement, original);
    assert_eq!(engine.buffers().names(), vec!["Log"]);
    assert!(engine.buffers().get_as::<LogBuffer>(replacement).is_some());
}

#[test]
fn killed_buffers_are_replaced_in_every_window() {
    let mut engine = engine();
    let log = engine.current_buffer().unwrap();
    let console = engine.switch_to_buffer::<ConsoleBuffer>(&"console".to_string()).unwrap();
    engine.split_below().unwrap();
    assert!(engine.windows().active().windows().all(|w| w.buffer() == console));

    assert!(engine.kill_buffer(console).unwrap());
    assert!(engine.windows().active().windows().all(|w| w.buffer() == log));
    assert!(!engine.kill_buffer(console).unwrap());
}

#[test]
fn tab_rotates_through_buffers_without_reordering() {
    let mut engine = engine();
    engine.create_buffer::<ConsoleBuffer>(&"one".to_string()).unwrap();
    engine.create_buffer::<ConsoleBuffer>(&"two".to_string()).unwrap();
    let order = engine.buffers().names();
    assert_eq!(order, vec!["two", "one", "Log"]);

    press(&mut engine, "<tab>");
    assert_eq!(engine.buffers().get(engine.current_buffer().unwrap()).unwrap().name(), "two");
    press(&mut engine, "S-<tab> S-<tab>");
    assert_eq!(engine.buffers().get(engine.current_buffer().unwrap()).unwrap().name(), "one");
    assert_eq!(engine.buffers().names(), order);
}

// ---------------------------------------------------------------------------
// Reactor
// ---------------------------------------------------------------------------

#[test]
fn waitable_handlers_run_inside_the_loop() {
    let mut engine = engine();
    let (pipe_reader, mut writer) = os_pipe::pipe().unwrap();
    assert!(!engine.reactor().is_active());

    let id = engine.register_waitable(pipe_reader, |engine: &mut Engine, id| {
        let mut chunk = [0u8; 64];
        let read = match engine.reactor_mut().waitable_mut::<os_pipe::PipeReader>(id) {
            Some(pipe) => pipe.read(&mut chunk)?,
            None => return Ok(()),
        };
        for line in String::from_utf8_lossy(&chunk[..read]).lines() {
            if line == "quit" {
                engine.exit();
            } else {
                engine.message(format!("got {line}"));
            }
        }
        Ok(())
    });
    assert!(engine.reactor().is_active());

    writer.write_all(b"hello\nquit\n").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.last_message(), Some("got hello"));

    engine.unregister_waitable(id).unwrap();
    assert!(!engine.reactor().is_active());
}

#[test]
fn async_events_from_another_thread_wake_the_loop() {
    let mut engine = engine();
    engine
        .register_async("ping", |engine: &mut Engine, name| {
            engine.message(format!("{name} received"));
            engine.exit();
            Ok(())
        })
        .unwrap();
    let poster = engine.async_poster().unwrap();
    let worker = thread::spawn(move || poster.post("ping"));

    engine.run().unwrap();
    worker.join().unwrap().unwrap();
    assert_eq!(engine.last_message(), Some("ping received"));
}
