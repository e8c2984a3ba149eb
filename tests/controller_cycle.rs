use lumaclock::{
    app::{
        AppContext, ClockController, ControllerSettings, DisplayMode, LogLevel, Logger,
        MonotonicClock,
    },
    display::{ClockColor, DisplayPresenter},
    sensors::{LightSensor, MotionSensor, SensorGate},
    timekeeping::{TimeSample, TimeSource},
    weather::{Units, WeatherFetcher, WeatherSnapshot},
    Error, Result,
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    sync::atomic::AtomicBool,
    time::{Duration, Instant},
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Sync,
    Apply,
    Fetch,
    Clock {
        hour_12: u8,
        minute: u8,
        colon: bool,
        color: ClockColor,
    },
    Weather {
        index: usize,
        has_snapshot: bool,
    },
    Blank(ClockColor),
    Message(String),
    Sleep(Duration),
}

type Events = Rc<RefCell<Vec<Event>>>;

/// Queue that repeats its last entry once drained.
#[derive(Clone)]
struct Script<T: Clone>(Rc<RefCell<VecDeque<T>>>);

impl<T: Clone> Script<T> {
    fn new(items: Vec<T>) -> Self {
        Self(Rc::new(RefCell::new(items.into())))
    }

    fn next(&self) -> Option<T> {
        let mut q = self.0.borrow_mut();
        if q.len() > 1 {
            q.pop_front()
        } else {
            q.front().cloned()
        }
    }

    fn replace(&self, items: Vec<T>) {
        *self.0.borrow_mut() = items.into();
    }
}

struct FakeLight(Script<Option<f32>>);

impl LightSensor for FakeLight {
    fn read_lux(&mut self) -> Result<f32> {
        self.0
            .next()
            .flatten()
            .ok_or_else(|| Error::SensorRead("i2c nack".into()))
    }
}

struct FakeMotion(Script<Option<bool>>);

impl MotionSensor for FakeMotion {
    fn shake(&mut self, threshold: f32) -> Result<bool> {
        assert_eq!(threshold, 10.5);
        self.0
            .next()
            .unwrap_or(Some(false))
            .ok_or_else(|| Error::SensorRead("lis3dh nack".into()))
    }
}

fn local_sample() -> TimeSample {
    TimeSample {
        hour: 14,
        minute: 5,
        second: 8,
        timestamp: 1_709_319_908,
    }
}

struct FakeTime {
    events: Events,
    results: Script<bool>,
    local: Rc<Cell<TimeSample>>,
}

impl TimeSource for FakeTime {
    fn fetch_authoritative_time(&mut self) -> Result<TimeSample> {
        self.events.borrow_mut().push(Event::Sync);
        if self.results.next().unwrap_or(true) {
            Ok(local_sample())
        } else {
            Err(Error::Transport("sntp request timed out".into()))
        }
    }

    fn apply_to_local_clock(&mut self, sample: &TimeSample) -> Result<()> {
        self.events.borrow_mut().push(Event::Apply);
        self.local.set(*sample);
        Ok(())
    }

    fn local_time(&self) -> TimeSample {
        self.local.get()
    }
}

fn snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: 61.0,
        conditions: "Clear".into(),
        location: "Boston, US".into(),
        feels_like: Some(59.0),
        humidity: Some(40),
        wind_speed: Some(5.0),
        units: Units::Imperial,
    }
}

struct FakeWeather {
    events: Events,
    results: Script<bool>,
}

impl WeatherFetcher for FakeWeather {
    fn fetch(&mut self, location: &str, units: Units) -> Result<WeatherSnapshot> {
        assert_eq!(location, "Boston, US");
        assert_eq!(units, Units::Imperial);
        self.events.borrow_mut().push(Event::Fetch);
        if self.results.next().unwrap_or(true) {
            Ok(snapshot())
        } else {
            Err(Error::Protocol("status 401".into()))
        }
    }
}

struct FakePresenter(Events);

impl DisplayPresenter for FakePresenter {
    fn show_clock(
        &mut self,
        hour_12: u8,
        minute: u8,
        colon_visible: bool,
        color: ClockColor,
    ) -> Result<()> {
        self.0.borrow_mut().push(Event::Clock {
            hour_12,
            minute,
            colon: colon_visible,
            color,
        });
        Ok(())
    }

    fn show_weather_field(
        &mut self,
        snapshot: Option<&WeatherSnapshot>,
        field_index: usize,
    ) -> Result<()> {
        self.0.borrow_mut().push(Event::Weather {
            index: field_index,
            has_snapshot: snapshot.is_some(),
        });
        Ok(())
    }

    fn set_blank(&mut self, color: ClockColor) -> Result<()> {
        self.0.borrow_mut().push(Event::Blank(color));
        Ok(())
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        self.0.borrow_mut().push(Event::Message(text.to_string()));
        Ok(())
    }
}

struct FakeClock {
    start: Instant,
    elapsed: Rc<Cell<Duration>>,
    events: Events,
}

impl MonotonicClock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.events.borrow_mut().push(Event::Sleep(duration));
        self.elapsed.set(self.elapsed.get() + duration);
    }
}

struct Harness {
    controller: ClockController,
    events: Events,
    light: Script<Option<f32>>,
    shakes: Script<Option<bool>>,
    time_results: Script<bool>,
    weather_results: Script<bool>,
    local: Rc<Cell<TimeSample>>,
    elapsed: Rc<Cell<Duration>>,
    running: AtomicBool,
}

impl Harness {
    fn new(blink: bool) -> Self {
        let events: Events = Rc::new(RefCell::new(Vec::new()));
        let light = Script::new(vec![Some(9.0)]);
        let shakes = Script::new(vec![Some(false)]);
        let time_results = Script::new(vec![true]);
        let weather_results = Script::new(vec![true]);
        let local = Rc::new(Cell::new(local_sample()));
        let elapsed = Rc::new(Cell::new(Duration::ZERO));

        let ctx = AppContext {
            sensors: SensorGate::new(
                Box::new(FakeLight(light.clone())),
                Box::new(FakeMotion(shakes.clone())),
                6.5,
            ),
            time: Box::new(FakeTime {
                events: events.clone(),
                results: time_results.clone(),
                local: local.clone(),
            }),
            weather: Box::new(FakeWeather {
                events: events.clone(),
                results: weather_results.clone(),
            }),
            display: Box::new(FakePresenter(events.clone())),
            clock: Box::new(FakeClock {
                start: Instant::now(),
                elapsed: elapsed.clone(),
                events: events.clone(),
            }),
            logger: Logger::new(LogLevel::Error, None),
        };
        let settings = ControllerSettings {
            blink,
            location: "Boston, US".into(),
            units: Units::Imperial,
            weather_time_display: Duration::from_secs(15),
            shake_threshold: 10.5,
        };
        Self {
            controller: ClockController::new(ctx, settings),
            events,
            light,
            shakes,
            time_results,
            weather_results,
            local,
            elapsed,
            running: AtomicBool::new(true),
        }
    }

    fn step(&mut self) -> DisplayMode {
        self.controller.step(&self.running)
    }

    fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

fn count(events: &[Event], wanted: &Event) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

fn count_weather(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Weather { .. }))
        .count()
}

#[test]
fn first_steady_cycle_syncs_with_forced_colon() {
    let mut h = Harness::new(true);
    assert_eq!(h.step(), DisplayMode::Clock);
    let events = h.take_events();
    assert_eq!(
        events,
        vec![
            Event::Clock {
                hour_12: 2,
                minute: 5,
                colon: true,
                color: ClockColor::Day
            },
            Event::Sync,
            Event::Apply,
            // second 8 is even, so the blinking colon is hidden
            Event::Clock {
                hour_12: 2,
                minute: 5,
                colon: false,
                color: ClockColor::Day
            },
            Event::Sleep(Duration::from_secs(1)),
        ]
    );
    assert!(h.controller.clock_refresh_timer().last_fired().is_some());
    assert!(h.controller.time_sync_timer().last_fired().is_some());
}

#[test]
fn steady_sync_is_not_repeated_within_the_hour() {
    let mut h = Harness::new(true);
    for _ in 0..5 {
        h.step();
    }
    let events = h.take_events();
    assert_eq!(count(&events, &Event::Sync), 1);
    assert_eq!(count(&events, &Event::Fetch), 0);

    h.advance(Duration::from_secs(3600));
    h.step();
    assert_eq!(count(&h.take_events(), &Event::Sync), 1);
}

#[test]
fn failed_steady_sync_retries_next_cycle() {
    let mut h = Harness::new(true);
    h.time_results.replace(vec![false, true]);
    h.step();
    assert!(h.controller.clock_refresh_timer().last_fired().is_none());
    h.step();
    let events = h.take_events();
    assert_eq!(count(&events, &Event::Sync), 2);
    assert_eq!(count(&events, &Event::Apply), 1);
    assert!(h.controller.clock_refresh_timer().last_fired().is_some());
}

#[test]
fn lit_then_dark_blanks_without_network() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(9.0), Some(3.0)]);
    h.step();
    h.take_events();

    assert_eq!(h.step(), DisplayMode::Dark);
    let events = h.take_events();
    assert_eq!(
        events,
        vec![
            Event::Blank(ClockColor::Off),
            Event::Sleep(Duration::from_millis(100)),
        ]
    );
    assert!(h.controller.state().dark_since_last_check);
}

#[test]
fn shake_read_error_in_dark_keeps_polling() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(3.0)]);
    h.shakes.replace(vec![None]);

    for _ in 0..2 {
        assert_eq!(h.step(), DisplayMode::Dark);
        let events = h.take_events();
        assert_eq!(
            events,
            vec![
                Event::Blank(ClockColor::Off),
                Event::Sleep(Duration::from_millis(100)),
            ]
        );
    }
    assert!(h.controller.state().dark_since_last_check);
    assert!(h.controller.time_sync_timer().last_fired().is_none());
    assert!(h.controller.weather_sync_timer().last_fired().is_none());
}

#[test]
fn shake_in_dark_shows_time_for_five_seconds() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(3.0)]);
    h.shakes.replace(vec![Some(true), Some(false)]);

    assert_eq!(h.step(), DisplayMode::Dark);
    let events = h.take_events();
    assert_eq!(
        events,
        vec![
            Event::Blank(ClockColor::Off),
            Event::Clock {
                hour_12: 2,
                minute: 5,
                colon: false,
                color: ClockColor::Day
            },
            Event::Sleep(Duration::from_secs(5)),
            Event::Blank(ClockColor::Off),
            Event::Sleep(Duration::from_millis(100)),
        ]
    );
    assert!(h.controller.time_sync_timer().last_fired().is_none());
    assert!(h.controller.weather_sync_timer().last_fired().is_none());

    h.step();
    let events = h.take_events();
    assert!(!events.iter().any(|e| matches!(e, Event::Clock { .. })));
}

#[test]
fn showcase_after_dark_syncs_then_scrolls_weather() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    assert_eq!(h.step(), DisplayMode::Dark);
    h.take_events();

    // The showcase runs to its deadline inside one step.
    assert_eq!(h.step(), DisplayMode::Clock);
    let events = h.take_events();
    assert_eq!(&events[..2], &[Event::Sync, Event::Apply]);
    assert_eq!(count(&events, &Event::Sync), 1);
    assert_eq!(count(&events, &Event::Fetch), 1);

    // Sub-iterations at 0, 2, .. 14 s of a 15 s window.
    assert_eq!(count(&events, &Event::Sleep(Duration::from_secs(2))), 8);
    let indices: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            Event::Weather {
                index,
                has_snapshot,
            } => {
                assert!(*has_snapshot);
                Some(*index)
            }
            _ => None,
        })
        .collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
    assert!(!h.controller.state().dark_since_last_check);
    assert!(h.controller.snapshot().is_some());

    // Back to steady: no re-sync, the clock refresh timer was reset by the forced sync.
    h.step();
    assert_eq!(count(&h.take_events(), &Event::Sync), 0);
}

#[test]
fn failed_weather_retries_every_sub_iteration_and_keeps_nothing() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    h.weather_results.replace(vec![false, false, true]);
    h.step();
    h.take_events();
    h.step();
    let events = h.take_events();
    assert_eq!(count(&events, &Event::Fetch), 3);
    let shown: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            Event::Weather { has_snapshot, .. } => Some(*has_snapshot),
            _ => None,
        })
        .collect();
    assert_eq!(&shown[..3], &[false, false, true]);
}

#[test]
fn weather_is_fetched_at_most_once_per_ten_minutes() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(2.0), Some(9.0), Some(2.0), Some(9.0)]);
    h.step();
    h.step();
    h.step();
    h.step();
    let events = h.take_events();
    assert_eq!(count(&events, &Event::Fetch), 1);
    assert_eq!(count_weather(&events), 16);

    h.advance(Duration::from_secs(600));
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    h.step();
    h.step();
    assert_eq!(count(&h.take_events(), &Event::Fetch), 1);
}

#[test]
fn stale_snapshot_survives_failed_refresh() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    h.step();
    h.step();
    assert!(h.controller.snapshot().is_some());

    h.advance(Duration::from_secs(601));
    h.weather_results.replace(vec![false]);
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    h.step();
    h.take_events();
    h.step();
    let events = h.take_events();
    assert_eq!(count(&events, &Event::Fetch), 8);
    assert!(events.iter().all(|e| !matches!(
        e,
        Event::Weather {
            has_snapshot: false,
            ..
        }
    )));
    assert_eq!(h.controller.snapshot(), Some(&snapshot()));
}

#[test]
fn failed_forced_sync_is_retried_inside_showcase() {
    let mut h = Harness::new(true);
    h.light.replace(vec![Some(2.0), Some(9.0)]);
    h.time_results.replace(vec![false, true]);
    h.step();
    h.take_events();
    h.step();
    let events = h.take_events();
    assert_eq!(&events[..3], &[Event::Sync, Event::Sync, Event::Apply]);
    assert_eq!(count(&events, &Event::Sync), 2);
}

#[test]
fn sensor_failure_reuses_last_classification() {
    let mut h = Harness::new(true);
    // Initially assumed lit.
    h.light.replace(vec![None]);
    assert_eq!(h.step(), DisplayMode::Clock);

    h.light.replace(vec![Some(3.0), None]);
    assert_eq!(h.step(), DisplayMode::Dark);
    assert_eq!(h.step(), DisplayMode::Dark);
}

#[test]
fn rendering_same_sample_twice_is_identical() {
    let mut h = Harness::new(true);
    h.step();
    h.take_events();
    h.step();
    let first = h.take_events();
    h.step();
    let second = h.take_events();
    assert_eq!(first, second);
}

#[test]
fn colon_stays_on_without_blink_and_blinks_on_odd_seconds() {
    let mut h = Harness::new(false);
    h.step();
    h.step();
    let events = h.take_events();
    assert!(events
        .iter()
        .all(|e| !matches!(e, Event::Clock { colon: false, .. })));

    let mut h = Harness::new(true);
    h.step();
    h.take_events();
    h.local.set(TimeSample {
        hour: 21,
        minute: 40,
        second: 9,
        timestamp: 0,
    });
    h.step();
    let events = h.take_events();
    assert_eq!(
        events[0],
        Event::Clock {
            hour_12: 9,
            minute: 40,
            colon: true,
            color: ClockColor::Night
        }
    );
}

#[test]
fn run_exits_on_shutdown_and_shows_offline() {
    let mut h = Harness::new(true);
    h.running = AtomicBool::new(false);
    h.controller.run(&h.running);
    assert_eq!(h.take_events(), vec![Event::Message("offline".into())]);
}
