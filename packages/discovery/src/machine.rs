//! Machine trait.
//!
//! Machines are pure state machines that interpret events and decide on
//! commands. State lives inside the machine and `decide` is synchronous.
//!
//! # Key Properties
//!
//! - **State is internal**: each machine owns its state via `&mut self`
//! - **Pure decisions**: no IO, no async, no clock reads
//! - **One event, at most one command**: returns `Option<Command>`
//! - **Time is an input**: events arrive stamped with logical time, so
//!   timers are driven by the caller

use crate::timer::Millis;

/// A state machine that interprets events and decides on commands.
///
/// # Example
///
/// ```ignore
/// struct CounterMachine {
///     count: u32,
/// }
///
/// impl Machine for CounterMachine {
///     type Event = CounterEvent;
///     type Command = CounterCommand;
///
///     fn decide(&mut self, event: Timed<CounterEvent>) -> Option<CounterCommand> {
///         match event.event {
///             CounterEvent::Increment => {
///                 self.count += 1;
///                 Some(CounterCommand::UpdateDisplay { value: self.count })
///             }
///             CounterEvent::Noop => None,
///         }
///     }
/// }
/// ```
pub trait Machine: Send + 'static {
    /// The event type this machine handles.
    type Event: Send + 'static;

    /// The command type this machine can emit.
    type Command: Send + 'static;

    /// Process an event and optionally return a command.
    ///
    /// # Guarantees
    ///
    /// - Called synchronously (no async)
    /// - Called serially (no concurrent calls)
    /// - Event timestamps never go backwards
    fn decide(&mut self, event: Timed<Self::Event>) -> Option<Self::Command>;
}

/// An event stamped with the logical time it was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<E> {
    pub at: Millis,
    pub event: E,
}

impl<E> Timed<E> {
    pub fn new(at: Millis, event: E) -> Self {
        Self { at, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum CounterEvent {
        Increment,
        Reset,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterCommand {
        UpdateDisplay { value: i32, at: Millis },
    }

    struct CounterMachine {
        count: i32,
    }

    impl Machine for CounterMachine {
        type Event = CounterEvent;
        type Command = CounterCommand;

        fn decide(&mut self, event: Timed<CounterEvent>) -> Option<CounterCommand> {
            match event.event {
                CounterEvent::Increment => {
                    self.count += 1;
                    Some(CounterCommand::UpdateDisplay {
                        value: self.count,
                        at: event.at,
                    })
                }
                CounterEvent::Reset => {
                    self.count = 0;
                    None
                }
            }
        }
    }

    #[test]
    fn test_machine_decides_with_timestamps() {
        let mut machine = CounterMachine { count: 0 };

        assert_eq!(
            machine.decide(Timed::new(10, CounterEvent::Increment)),
            Some(CounterCommand::UpdateDisplay { value: 1, at: 10 })
        );
        assert_eq!(machine.decide(Timed::new(20, CounterEvent::Reset)), None);
        assert_eq!(machine.count, 0);
    }
}
