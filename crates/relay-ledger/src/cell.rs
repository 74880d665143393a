//! Message cells
//!
//! A cell holds up to 1023 data bits and up to 4 references to child cells.
//! Message bodies sent to contracts are trees of cells built with
//! [`CellBuilder`] and read back with [`CellSlice`].
//!
//! The wire encoding is a preorder walk: each cell is written as
//! `refs_count`, a bit-length descriptor `floor(b/8) + ceil(b/8)`, its data
//! bytes (with a completion tag when `b` is not byte aligned), then its
//! children.

use crate::error::{LedgerError, Result};

/// Maximum data bits in a single cell
pub const MAX_BITS: usize = 1023;

/// Maximum child references of a single cell
pub const MAX_REFS: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl Cell {
    /// Cell with no data and no references
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    /// Reader positioned at the start of this cell
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    fn bit(&self, index: usize) -> bool {
        self.data[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Serialize the cell tree
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let full_bytes = self.bit_len / 8;
        let total_bytes = self.bit_len.div_ceil(8);

        out.push(self.refs.len() as u8);
        out.push((full_bytes + total_bytes) as u8);

        let start = out.len();
        out.extend_from_slice(&self.data[..total_bytes]);
        if self.bit_len % 8 != 0 {
            // completion tag: a single 1 bit right after the data
            out[start + total_bytes - 1] |= 0x80 >> (self.bit_len % 8);
        }

        for child in &self.refs {
            child.write_to(out);
        }
    }

    /// Deserialize a cell tree produced by [`Cell::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let cell = Self::read_from(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(LedgerError::Encoding(format!(
                "{} trailing bytes after cell tree",
                bytes.len() - pos
            )));
        }
        Ok(cell)
    }

    fn read_from(bytes: &[u8], pos: &mut usize) -> Result<Self> {
        let header = bytes
            .get(*pos..*pos + 2)
            .ok_or_else(|| LedgerError::Encoding("truncated cell header".into()))?;
        let refs_count = header[0] as usize;
        let descriptor = header[1] as usize;
        *pos += 2;

        if refs_count > MAX_REFS {
            return Err(LedgerError::Encoding(format!(
                "cell declares {} refs",
                refs_count
            )));
        }

        let total_bytes = descriptor.div_ceil(2);
        let mut data = bytes
            .get(*pos..*pos + total_bytes)
            .ok_or_else(|| LedgerError::Encoding("truncated cell data".into()))?
            .to_vec();
        *pos += total_bytes;

        let bit_len = if descriptor % 2 == 0 {
            total_bytes * 8
        } else {
            let last = data
                .last_mut()
                .ok_or_else(|| LedgerError::Encoding("missing completion byte".into()))?;
            if *last == 0 {
                return Err(LedgerError::Encoding("missing completion tag".into()));
            }
            let padding = last.trailing_zeros() as usize;
            // clear the tag so equal cells compare equal
            *last &= !(1u8 << padding);
            (total_bytes - 1) * 8 + (7 - padding)
        };

        if bit_len > MAX_BITS {
            return Err(LedgerError::Encoding(format!("cell holds {} bits", bit_len)));
        }

        let mut refs = Vec::with_capacity(refs_count);
        for _ in 0..refs_count {
            refs.push(Self::read_from(bytes, pos)?);
        }

        Ok(Self {
            data,
            bit_len,
            refs,
        })
    }
}

/// Builder for a [`Cell`]
///
/// ```rust
/// use relay_ledger::cell::CellBuilder;
///
/// # fn main() -> relay_ledger::Result<()> {
/// let cell = CellBuilder::new()
///     .store_uint(0, 32)?
///     .store_string_tail("hello")?
///     .build();
/// assert_eq!(cell.bit_len(), 72);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    pub fn store_bit(mut self, bit: bool) -> Result<Self> {
        if self.bit_len == MAX_BITS {
            return Err(LedgerError::Encoding("cell overflow: more than 1023 bits".into()));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Store `value` as an unsigned big-endian integer of `bits` width
    pub fn store_uint(mut self, value: u128, bits: usize) -> Result<Self> {
        if bits > 128 {
            return Err(LedgerError::Encoding(format!("uint width {} exceeds 128", bits)));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(LedgerError::Encoding(format!(
                "value {} does not fit in {} bits",
                value, bits
            )));
        }
        if bits > self.remaining_bits() {
            return Err(LedgerError::Encoding(format!(
                "cell overflow: {} bits requested, {} free",
                bits,
                self.remaining_bits()
            )));
        }

        for i in (0..bits).rev() {
            self = self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_bytes(mut self, bytes: &[u8]) -> Result<Self> {
        if bytes.len() * 8 > self.remaining_bits() {
            return Err(LedgerError::Encoding(format!(
                "cell overflow: {} bytes requested, {} bits free",
                bytes.len(),
                self.remaining_bits()
            )));
        }
        for byte in bytes {
            self = self.store_uint(*byte as u128, 8)?;
        }
        Ok(self)
    }

    /// Store a string, continuing in a chain of child cells once this one is full
    pub fn store_string_tail(self, text: &str) -> Result<Self> {
        self.store_bytes_tail(text.as_bytes())
    }

    fn store_bytes_tail(self, bytes: &[u8]) -> Result<Self> {
        let fits = self.remaining_bits() / 8;
        if bytes.len() <= fits {
            return self.store_bytes(bytes);
        }

        let (head, rest) = bytes.split_at(fits);
        let child = CellBuilder::new().store_bytes_tail(rest)?.build();
        self.store_bytes(head)?.store_ref(child)
    }

    pub fn store_ref(mut self, cell: Cell) -> Result<Self> {
        if self.refs.len() == MAX_REFS {
            return Err(LedgerError::Encoding("cell overflow: more than 4 refs".into()));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}

/// Sequential reader over a [`Cell`]
#[derive(Clone, Debug)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        if self.remaining_bits() == 0 {
            return Err(LedgerError::Encoding("cell underflow".into()));
        }
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128> {
        if bits > 128 {
            return Err(LedgerError::Encoding(format!("uint width {} exceeds 128", bits)));
        }
        if bits > self.remaining_bits() {
            return Err(LedgerError::Encoding(format!(
                "cell underflow: {} bits requested, {} left",
                bits,
                self.remaining_bits()
            )));
        }

        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u128;
        }
        Ok(value)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        (0..len).map(|_| self.load_uint(8).map(|b| b as u8)).collect()
    }

    pub fn load_ref(&mut self) -> Result<&'a Cell> {
        let cell = self
            .cell
            .refs
            .get(self.ref_pos)
            .ok_or_else(|| LedgerError::Encoding("no refs left".into()))?;
        self.ref_pos += 1;
        Ok(cell)
    }

    /// Read the rest of a string written by [`CellBuilder::store_string_tail`]
    ///
    /// The chain continues into the next ref only out of a full cell.
    pub fn load_string_tail(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        self.load_bytes_tail(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| LedgerError::Encoding(e.to_string()))
    }

    fn load_bytes_tail(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.remaining_bits() % 8 != 0 {
            return Err(LedgerError::Encoding("string tail is not byte aligned".into()));
        }
        out.extend(self.load_bytes(self.remaining_bits() / 8)?);

        if self.cell.bit_len > MAX_BITS - 8 && self.remaining_refs() > 0 {
            let next = self.load_ref()?;
            next.parse().load_bytes_tail(out)?;
        }
        Ok(())
    }

    /// Fail unless every bit and ref was consumed
    pub fn end_parse(&self) -> Result<()> {
        if self.remaining_bits() != 0 || self.remaining_refs() != 0 {
            return Err(LedgerError::Encoding(format!(
                "{} bits and {} refs left unread",
                self.remaining_bits(),
                self.remaining_refs()
            )));
        }
        Ok(())
    }
}
