//! Import bills of materials and schematic netlists exported by EDA tools.
//!
//! The main input is the RINF (`.frp`) netlist exported by Altium Designer
//! and KiCad, which carries both the components and their connections:
//!
//! ```no_run
//! use rinf_netlist::RinfReader;
//!
//! let import = RinfReader::new().from_path("board.frp")?;
//! for row in import.bom.rows.iter() {
//!     println!("{row}");
//! }
//! for (designator, pins) in import.netlist.filter_designator("U").to_dict() {
//!     println!("{designator}: {pins:?}");
//! }
//! for diagnostic in &import.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok::<(), rinf_netlist::Error>(())
//! ```
//!
//! BOM reports saved as CSV are read with [`AltiumBomReader`].

pub mod bom;
pub mod bom_reader;
pub mod error;
pub mod netlist;
pub mod rinf;

pub use bom::{
    normalize_designator, Bom, BomData, BomField, BomRow, BomRows, FieldKind, FieldRecord,
    FieldValue,
};
pub use bom_reader::{AltiumBomReader, BomImport};
pub use error::{Diagnostic, DiagnosticKind, Error, FieldError};
pub use netlist::{Connection, Designator, Designators, Net, Netlist, Pins};
pub use rinf::{Flavor, RinfImport, RinfReader};
