//! DIRSIG lidar bin format decoding.
//!
//! Each structure follows the same layered approach:
//! - `layout`: field widths, codes and the version-gated layout variants
//! - `cursor`: sequential byte access and byte-order conventions
//! - `file_header` / `task_header` / `pulse_header` / `payload`: domain-level
//!   decoding (no direct byte indexing)
//! - `error`: explicit errors carrying the failing stage and byte offset
//!
//! Structures are decoded strictly in document order: the file header fixes
//! byte order and pixel grid, each task header fixes its pulse count, and each
//! pulse header fixes the stored length of its own payload.
//!
//! Version française (résumé):
//! Décodage du format binaire lidar DIRSIG, structure par structure, dans
//! l'ordre du document. Les largeurs de champs sont dans `layout`, la lecture
//! séquentielle dans `cursor`, les erreurs (étape + position) dans `error`.

pub mod bin_file;
pub mod cursor;
pub mod error;
pub mod file_header;
pub mod layout;
pub mod payload;
pub mod pulse_header;
pub mod task_header;
