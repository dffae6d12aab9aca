//! Low-level EVM assembly primitives: the opcode table, the hierarchical
//! mark-id scheme macro expansion allocates from, and the assembler that
//! turns a stream of opcodes/marks/references into flat bytecode.

mod asm;
mod assembler;
mod ids;
mod opcodes;

pub use asm::{Asm, RefTarget, SizedRef, SolidAsm};
pub use assembler::{assemble, needed_bytes, AssembleError};
pub use ids::{ContextTracker, MarkId, MarkPurpose, ObjectId};
pub use opcodes::{bytes_to_push, minimal_push, Opcode, OpcodeError};
