use crate::{
    asm::{assemble_with, AsmOptions, Program},
    error::{AsmError, MemoryError, ERROR_MARKER},
    memory::Memory,
};

/// Shown in the listing buffer before anything is assembled.
pub const WELCOME: &str = "Press 'Assemble' to build the program.\n\n\
                           Press 'Write code to Main Memory' to send it to main memory.";

/// Appended to the listing buffer once it has been written to memory.
pub const WRITTEN_NOTE: &str = "// Program written to main memory";

/// Editable source, the listing it assembles to, and the main memory it gets written into.
pub struct Workbench {
    source: String,
    listing: String,
    options: AsmOptions,
    memory: Option<Memory>,
}

impl Workbench {
    pub fn new(source: impl Into<String>) -> Self {
        Workbench {
            source: source.into(),
            listing: WELCOME.to_string(),
            options: AsmOptions::default(),
            memory: None,
        }
    }

    pub fn with_options(mut self, options: AsmOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Assembler output, or an error report.
    pub fn listing(&self) -> &str {
        &self.listing
    }

    /// Attach the main memory the program gets written into.
    pub fn link_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut Memory> {
        self.memory.as_mut()
    }

    /// Detach and return the linked memory.
    pub fn unlink_memory(&mut self) -> Option<Memory> {
        self.memory.take()
    }

    /// Assemble the current source. The listing buffer is replaced entirely, by the program on
    /// success or by a single error report on failure.
    pub fn assemble(&mut self) -> Result<Program, AsmError> {
        match assemble_with(&self.source, self.options) {
            Ok(program) => {
                self.listing = program.listing();
                Ok(program)
            }
            Err(err) => {
                self.listing = err.report();
                Err(err)
            }
        }
    }

    /// Load the listing buffer into main memory. Returns the amount of words written.
    pub fn write_to_memory(&mut self) -> Result<usize, MemoryError> {
        let Some(memory) = self.memory.as_mut() else {
            self.listing = format!(
                "{ERROR_MARKER}: {}.\n{}",
                MemoryError::NotLinked,
                self.listing
            );
            return Err(MemoryError::NotLinked);
        };

        match memory.load_program(&self.listing) {
            Ok(written) => {
                if !self.listing.starts_with(ERROR_MARKER) {
                    self.listing = format!("{}\n\n{WRITTEN_NOTE}", self.listing);
                }
                Ok(written)
            }
            Err(err) => {
                self.listing = format!("{ERROR_MARKER} WRITING TO MEMORY:\n{err}");
                Err(err)
            }
        }
    }
}
