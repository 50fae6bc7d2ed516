use std::{cell::RefCell, ffi::OsStr};

/// Step budget used by the front end when neither `--max-steps` nor `EMU86_MAX_STEPS` is given.
pub const DEFAULT_MAX_STEPS: u64 = 100_000;

#[derive(Clone, Copy)]
struct Env {
    /// `None` means unlimited
    max_steps: Option<u64>,
    trace_enabled: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        max_steps: parse_max_steps(std::env::var("EMU86_MAX_STEPS").ok().as_deref()),
        trace_enabled: var_is("EMU86_TRACE", "1"),
    };
    set_env(value);
}

/// Step budget for `run`. `EMU86_MAX_STEPS=0` disables the limit.
pub fn max_steps() -> Option<u64> {
    with_env(|env| env.max_steps)
}

pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace_enabled)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

/// Unparseable values fall back to the default.
fn parse_max_steps(value: Option<&str>) -> Option<u64> {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(0)) => None,
        Some(Ok(limit)) => Some(limit),
        Some(Err(_)) | None => Some(DEFAULT_MAX_STEPS),
    }
}
