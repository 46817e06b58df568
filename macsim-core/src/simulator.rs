//! Batch execution driver for a [`Core`].

use crate::core::{Core, Exception, HaltReason, StepOutcome};
use log::{debug, trace};

/// Why [`Simulator::run`] returned.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RunOutcome {
    /// The simulated program stopped itself.
    Halted(HaltReason),
    /// An exception ended the run; reported with the pc of the faulting instruction.
    Trapped { exception: Exception, pc: u32 },
    /// The instruction budget ran out before the program stopped.
    BudgetExhausted,
}

/// Drives a [`Core`] step by step until the simulated program stops making forward progress.
///
/// This is a purely functional driver: it retires one instruction per step and keeps a retired
/// instruction count. There is no timing model and no execution history.
#[derive(Debug)]
pub struct Simulator {
    core: Core,
    instructions_retired: u64,
}

impl Simulator {
    pub fn new(core: Core) -> Self {
        Self {
            core,
            instructions_retired: 0,
        }
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// The number of instructions retired since this simulator was created.
    pub fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    /// Retire a single instruction.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = self.core.step();
        if let StepOutcome::Retired = outcome {
            self.instructions_retired += 1;
        }
        outcome
    }

    /// Run until the program halts, an exception ends the run, or `max_instructions` (if given)
    /// instructions have retired.
    pub fn run(&mut self, max_instructions: Option<u64>) -> RunOutcome {
        debug!(
            "Running from pc {:#010x}",
            self.core.registers().pc()
        );
        let budget_end = max_instructions.map(|n| self.instructions_retired.saturating_add(n));
        loop {
            if budget_end.is_some_and(|end| self.instructions_retired >= end) {
                trace!("Instruction budget exhausted");
                return RunOutcome::BudgetExhausted;
            }
            let pc = self.core.registers().pc();
            match self.step() {
                StepOutcome::Retired => {}
                StepOutcome::Halted(reason) => {
                    debug!(
                        "Halted after {} instructions: {reason:?}",
                        self.instructions_retired
                    );
                    return RunOutcome::Halted(reason);
                }
                StepOutcome::Trapped(exception) => {
                    debug!("Trapped at pc {pc:#010x}: {exception:?}");
                    return RunOutcome::Trapped { exception, pc };
                }
            }
        }
    }
}
