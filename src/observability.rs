use biometrics::{Collector, Counter, Moments};

pub(crate) static ENGINE_SPAWNS: Counter = Counter::new("llm_chat.engine.spawns");
pub(crate) static ENGINE_SPAWN_ERRORS: Counter = Counter::new("llm_chat.engine.spawn_errors");
pub(crate) static ENGINE_WRITES: Counter = Counter::new("llm_chat.engine.writes");

pub(crate) static STREAM_UNITS: Counter = Counter::new("llm_chat.stream.units");
pub(crate) static STREAM_TERMINATIONS: Counter = Counter::new("llm_chat.stream.terminations");
pub(crate) static STREAM_INTERRUPTS: Counter = Counter::new("llm_chat.stream.interrupts");
pub(crate) static STREAM_DISCARDED_UNITS: Counter =
    Counter::new("llm_chat.stream.discarded_units");

pub(crate) static CHAT_TURNS: Counter = Counter::new("llm_chat.chat.turns");
pub(crate) static CHAT_TURN_ERRORS: Counter = Counter::new("llm_chat.chat.turn_errors");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("llm_chat.chat.turn_duration_seconds");
pub(crate) static CHAT_COMMANDS: Counter = Counter::new("llm_chat.chat.commands");

pub(crate) static HISTORY_SAVES: Counter = Counter::new("llm_chat.history.saves");
pub(crate) static HISTORY_LOADS: Counter = Counter::new("llm_chat.history.loads");
pub(crate) static HISTORY_DELETES: Counter = Counter::new("llm_chat.history.deletes");
pub(crate) static HISTORY_ERRORS: Counter = Counter::new("llm_chat.history.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&ENGINE_SPAWNS);
    collector.register_counter(&ENGINE_SPAWN_ERRORS);
    collector.register_counter(&ENGINE_WRITES);

    collector.register_counter(&STREAM_UNITS);
    collector.register_counter(&STREAM_TERMINATIONS);
    collector.register_counter(&STREAM_INTERRUPTS);
    collector.register_counter(&STREAM_DISCARDED_UNITS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_ERRORS);
    collector.register_moments(&CHAT_TURN_DURATION);
    collector.register_counter(&CHAT_COMMANDS);

    collector.register_counter(&HISTORY_SAVES);
    collector.register_counter(&HISTORY_LOADS);
    collector.register_counter(&HISTORY_DELETES);
    collector.register_counter(&HISTORY_ERRORS);
}
