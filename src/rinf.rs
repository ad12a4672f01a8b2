//! RINF (`.frp`) netlist reader
//!
//! A RINF file is a list of commands, one per line:
//!
//! ```text
//! .HEA
//! .APP "Protel 2004"
//! .ADD_COM R1 "10k" "0402"
//! .ATT_COM R1 "Footprint" "R_0402"
//! .ADD_TER R1 1 "NetR1_1"
//! .TER     C1 2
//! .END
//! ```
//!
//! Altium Designer and KiCad export slightly different flavors of it. The
//! `.APP` line names the exporting tool and selects how component fields are
//! picked up.

use std::fmt::{self, Display};
use std::mem;
use std::ops::ControlFlow;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::bom::{Bom, FieldValue};
use crate::error::{Diagnostic, DiagnosticKind, Error};
use crate::netlist::Netlist;

mod lexer;
mod line;

pub use line::{Command, Line};

pub const FILE_HEADER: &str = ".HEA";
pub const FILE_END: &str = ".END";

/// Name of the tool that exported a file, from its `.APP` line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Flavor(String);

impl Flavor {
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Altium Designer, component fields come from `.ATT_COM` lines
    pub fn is_protel_2004(&self) -> bool {
        self.0.contains("Protel 2004")
    }

    /// KiCad, component fields come from the `.ADD_COM` line itself
    pub fn is_eeschema(&self) -> bool {
        self.0.contains("Eeschema")
    }
}

impl Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Find the flavor declared by the first `.APP` line
pub fn detect_flavor<S: AsRef<str>>(lines: &[S]) -> Option<Flavor> {
    lines.iter().find_map(|line| {
        let line = Line::tokenize(line.as_ref());
        match line.command {
            Some(Command::App) => Some(Flavor(line.params.join(" "))),
            _ => None,
        }
    })
}

/// A file is only read if it starts with `.HEA` and ends with `.END`
pub fn is_valid<S: AsRef<str>>(lines: &[S]) -> bool {
    has_header(lines) && has_end(lines)
}

fn has_header<S: AsRef<str>>(lines: &[S]) -> bool {
    lines.first().map(|l| l.as_ref().trim_end()) == Some(FILE_HEADER)
}

fn has_end<S: AsRef<str>>(lines: &[S]) -> bool {
    lines.last().map(|l| l.as_ref().trim_end()) == Some(FILE_END)
}

/// Read a file as lines with trailing whitespace removed
pub fn read_lines(path: &Path) -> Result<Vec<String>, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(content.lines().map(|l| l.trim_end().to_owned()).collect())
}

/// Everything imported from one RINF file
#[derive(Clone, Debug, Default)]
pub struct RinfImport {
    pub bom: Bom,
    pub netlist: Netlist,
    pub flavor: Option<Flavor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Imports the BOM and the netlist of RINF files
#[derive(Clone, Debug, Default)]
pub struct RinfReader {
    flavor: Option<Flavor>,
}

impl RinfReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `flavor` instead of the one declared in the file
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    /// Import already read lines.
    ///
    /// Malformed content never fails the import, it shows up in
    /// [`RinfImport::diagnostics`] instead. A file without the `.HEA` and
    /// `.END` lines gives an empty BOM and netlist.
    pub fn read<S: AsRef<str>>(&self, lines: &[S]) -> RinfImport {
        let mut diagnostics = vec![];
        let (first, last) = match lines.len() {
            0 => (None, None),
            n => (Some(1), Some(n)),
        };
        if !has_header(lines) {
            diagnostics.push(Diagnostic::new(first, DiagnosticKind::MissingHeader));
        }
        if !has_end(lines) {
            diagnostics.push(Diagnostic::new(last, DiagnosticKind::MissingEnd));
        }
        if !diagnostics.is_empty() {
            for diagnostic in &diagnostics {
                warn!(%diagnostic, "not a RINF file");
            }
            return RinfImport {
                diagnostics,
                ..Default::default()
            };
        }

        let flavor = self.flavor.clone().or_else(|| detect_flavor(lines));
        debug!(flavor = ?flavor.as_ref().map(Flavor::as_str), "reading RINF netlist");

        let mut state = State::new(flavor.as_ref());
        for (i, line) in lines.iter().enumerate() {
            if state.step(i + 1, Line::tokenize(line.as_ref())).is_break() {
                break;
            }
        }

        let State {
            bom,
            netlist,
            diagnostics,
            ..
        } = state;
        debug!(
            rows = bom.rows.len(),
            nets = netlist.len(),
            diagnostics = diagnostics.len(),
            "read RINF netlist"
        );
        RinfImport {
            bom,
            netlist,
            flavor,
            diagnostics,
        }
    }

    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<RinfImport, Error> {
        let lines = read_lines(path.as_ref())?;
        Ok(self.read(&lines))
    }

    pub fn bom_from_path(&self, path: impl AsRef<Path>) -> Result<Bom, Error> {
        Ok(self.from_path(path)?.bom)
    }

    pub fn netlist_from_path(&self, path: impl AsRef<Path>) -> Result<Netlist, Error> {
        Ok(self.from_path(path)?.netlist)
    }
}

/// Parser state carried from line to line
struct State<'f> {
    flavor: Option<&'f Flavor>,
    designator: String,
    net: String,
    fields: IndexMap<String, FieldValue>,
    bom: Bom,
    netlist: Netlist,
    diagnostics: Vec<Diagnostic>,
}

impl<'f> State<'f> {
    fn new(flavor: Option<&'f Flavor>) -> Self {
        Self {
            flavor,
            designator: String::new(),
            net: String::new(),
            fields: IndexMap::new(),
            bom: Bom::default(),
            netlist: Netlist::new(),
            diagnostics: vec![],
        }
    }

    fn step(&mut self, lineno: usize, line: Line) -> ControlFlow<()> {
        let Line { command, params } = line;
        match command {
            Some(Command::AddComponent) => self.add_component(lineno, &params),
            Some(Command::AttachComponent) => self.attach_component(lineno, &params),
            Some(Command::AddTerminal) => self.add_terminal(lineno, &params),
            Some(Command::Terminal) => self.terminal(lineno, &params),
            Some(Command::End) => return ControlFlow::Break(()),
            Some(command) => trace!(lineno, %command, "ignored"),
            // Continuation of the last net without the `.TER` command
            None if params.len() == 2 && !self.net.is_empty() => self.terminal(lineno, &params),
            None => {}
        }
        ControlFlow::Continue(())
    }

    fn add_component(&mut self, lineno: usize, params: &[String]) {
        if !self.check_params(lineno, Command::AddComponent, params, 1) {
            return;
        }
        if params[0] != self.designator {
            self.flush(lineno);
            self.designator = params[0].clone();
        }
        if params.len() == 3 && self.flavor.is_some_and(Flavor::is_eeschema) {
            let (symbol, footprint) = match params[2].split_once(':') {
                Some((symbol, footprint)) if !footprint.contains(':') => (symbol, footprint),
                _ => ("", ""),
            };
            self.fields = IndexMap::from([
                ("Value".to_owned(), params[1].as_str().into()),
                ("Symbol".to_owned(), symbol.into()),
                ("Footprint".to_owned(), footprint.into()),
            ]);
        }
    }

    fn attach_component(&mut self, lineno: usize, params: &[String]) {
        if !self.check_params(lineno, Command::AttachComponent, params, 3) {
            return;
        }
        if params[0] == self.designator && self.flavor.is_some_and(Flavor::is_protel_2004) {
            self.fields
                .insert(params[1].clone(), params[2].as_str().into());
        }
    }

    fn add_terminal(&mut self, lineno: usize, params: &[String]) {
        if !self.check_params(lineno, Command::AddTerminal, params, 3) {
            return;
        }
        self.net = params[2].clone();
        self.netlist.append_pin(&self.net, &params[0], &params[1]);
        // A terminal confirms the current component
        self.flush(lineno);
    }

    fn terminal(&mut self, lineno: usize, params: &[String]) {
        if !self.check_params(lineno, Command::Terminal, params, 2) {
            return;
        }
        if self.net.is_empty() {
            // Still recorded, under the unnamed net
            self.report(
                lineno,
                DiagnosticKind::TerminalWithoutNet {
                    designator: params[0].clone(),
                    pin: params[1].clone(),
                },
            );
        }
        self.netlist.append_pin(&self.net, &params[0], &params[1]);
    }

    /// Store the fields collected for the current component as a BOM row
    fn flush(&mut self, lineno: usize) {
        let fields = mem::take(&mut self.fields);
        if self.designator.is_empty() {
            return;
        }
        let errors = self.bom.rows.append_by_designator(&self.designator, fields);
        for diagnostic in Diagnostic::dropped_fields(Some(lineno), &self.designator, errors) {
            warn!(%diagnostic, "dropped BOM field");
            self.diagnostics.push(diagnostic);
        }
    }

    fn check_params(
        &mut self,
        lineno: usize,
        command: Command,
        params: &[String],
        expected: usize,
    ) -> bool {
        if params.len() >= expected {
            return true;
        }
        self.report(
            lineno,
            DiagnosticKind::MissingParameters {
                command: command.to_string(),
                expected,
                found: params.len(),
            },
        );
        false
    }

    fn report(&mut self, lineno: usize, kind: DiagnosticKind) {
        let diagnostic = Diagnostic::new(Some(lineno), kind);
        warn!(%diagnostic, "skipped line");
        self.diagnostics.push(diagnostic);
    }
}
