pub mod cuil;
pub mod manual;
pub mod payload;
pub mod record;

pub use cuil::{Cuil, InvalidInputError, SexCode, TaxIdCheck, compute_cuil, verify_embedded};
pub use manual::{ManualEntry, ManualEntryError, mask_date_input};
pub use payload::{
    ParseError, ParsedIdentity, Parser, ParserConfig, Sex, TaxId, TaxIdFragment, TaxIdSource,
    correct_special_chars, parse,
};
pub use record::{PersistableRecord, StoredRecord, User, display_date, iso_timestamp, to_persistable};
