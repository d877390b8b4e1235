//! Text rendering of a run.

use std::io::{self, Write};

use crate::simulation::StepRecord;

/// Line written once every iteration has run.
pub const COMPLETION_MESSAGE: &str = "Simulasi selesai.";

/// Render one iteration as a progress line (without the trailing newline).
pub fn format_step(record: &StepRecord) -> String {
    format!(
        "Iterasi {}: Kecepatan = {:.2} km/jam, Error = {:.2}",
        record.iteration, record.speed, record.error
    )
}

pub fn write_step<W: Write>(out: &mut W, record: &StepRecord) -> io::Result<()> {
    writeln!(out, "{}", format_step(record))
}

pub fn write_completion<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", COMPLETION_MESSAGE)
}
