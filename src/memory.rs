use crate::{
    decode::DecodedView,
    error::{MemoryError, ERROR_MARKER},
    isa::MEMORY_SIZE,
    lexer::COMMENT,
};

/// Main memory: 4096 signed 16-bit words, each with an up to date decoded view.
pub struct Memory {
    words: Box<[i16; MEMORY_SIZE]>,
    views: Vec<DecodedView>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            words: Box::new([0; MEMORY_SIZE]),
            views: (0..MEMORY_SIZE as u16)
                .map(|address| DecodedView::new(address, 0))
                .collect(),
        }
    }

    fn index(address: i32) -> Result<usize, MemoryError> {
        usize::try_from(address)
            .ok()
            .filter(|&index| index < MEMORY_SIZE)
            .ok_or(MemoryError::AddressOutOfRange(address))
    }

    pub fn write(&mut self, address: i32, value: i16) -> Result<(), MemoryError> {
        let index = Self::index(address)?;
        self.words[index] = value;
        self.views[index] = DecodedView::new(index as u16, value);
        Ok(())
    }

    pub fn read(&self, address: i32) -> Result<i16, MemoryError> {
        Ok(self.words[Self::index(address)?])
    }

    /// Zero every word.
    pub fn clear(&mut self) {
        self.words.fill(0);
        for (address, view) in self.views.iter_mut().enumerate() {
            *view = DecodedView::new(address as u16, 0);
        }
    }

    /// Clear memory, then write every machine word of an assembler listing from address 0.
    ///
    /// Blank lines, comments and error lines are skipped, as is anything whose field before the
    /// first `/` is not exactly 16 binary digits. Returns the amount of words written.
    pub fn load_program(&mut self, listing: &str) -> Result<usize, MemoryError> {
        self.clear();
        let mut address = 0;
        for word in listing.lines().filter_map(machine_word) {
            self.write(address, word as i16)?;
            address += 1;
        }
        Ok(address as usize)
    }

    pub fn view(&self, address: i32) -> Result<&DecodedView, MemoryError> {
        Ok(&self.views[Self::index(address)?])
    }

    /// Decoded view of every address, in address order.
    pub fn views(&self) -> &[DecodedView] {
        &self.views
    }

    pub fn words(&self) -> &[i16] {
        &self.words[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Machine word at the start of a listing line, if there is one.
fn machine_word(line: &str) -> Option<u16> {
    if line.is_empty() || line.starts_with(COMMENT) || line.starts_with(ERROR_MARKER) {
        return None;
    }
    let field = line.split(COMMENT).next()?.trim();
    if field.len() != 16 || !field.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u16::from_str_radix(field, 2).ok()
}
