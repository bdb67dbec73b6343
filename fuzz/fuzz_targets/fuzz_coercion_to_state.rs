#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use storewire_core::{TimeZoneSetting, Value};
use storewire_input::{Coercion, ControlKind};

#[derive(Debug, Arbitrary)]
struct Input {
    control: u8,
    offset_minutes: i16,
    current: Option<f64>,
    raw: String,
}

const CONTROLS: [ControlKind; 5] = [
    ControlKind::Text,
    ControlKind::Number,
    ControlKind::Range,
    ControlKind::DateTimeLocal,
    ControlKind::Date,
];

fuzz_target!(|input: Input| {
    let kind = CONTROLS[usize::from(input.control) % CONTROLS.len()];
    let coercion = Coercion::for_control(kind, None);
    let zone = TimeZoneSetting::FixedOffset(i32::from(input.offset_minutes % (24 * 60)) * 60);
    let current = input.current.map(Value::Number);

    // Coercion never panics, and a successful value displays without panicking.
    if let Ok(value) = coercion.to_state(&input.raw, current.as_ref(), &zone) {
        let _ = coercion.to_display(Some(&value), &zone);
    }
});
