use crate::format::WINDOW_SIZE;

/// The 4 KiB history buffer shared by the encoder and the decoder.
///
/// The dictionary is not a view of the output: it has its own write cursor,
/// starts out zero filled, and wraps around independently of how much data
/// has been produced. Each encode or decode owns a fresh one.
#[derive(Clone)]
pub(crate) struct RollingDict {
    table: Box<[u8; WINDOW_SIZE]>,
    csr: usize,
}

impl RollingDict {
    pub(crate) fn new() -> Self {
        Self {
            table: Box::new([0; WINDOW_SIZE]),
            csr: 0,
        }
    }

    /// Current write position
    #[inline]
    pub(crate) fn cursor(&self) -> usize {
        self.csr
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> u8 {
        self.table[index % WINDOW_SIZE]
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.table[self.csr] = byte;
        self.csr = (self.csr + 1) % WINDOW_SIZE;
    }

    /// Copy `length` bytes starting at `index` to the write cursor, one byte at
    /// a time. Each copied byte is handed to `out` as well.
    ///
    /// The read and write windows may overlap, in which case bytes written
    /// earlier in the copy are read back later in the same copy.
    pub(crate) fn copy_back<F>(&mut self, index: usize, length: usize, mut out: F)
    where
        F: FnMut(u8),
    {
        let mut rd = index % WINDOW_SIZE;
        for _ in 0..length {
            let byte = self.table[rd];
            rd = (rd + 1) % WINDOW_SIZE;
            self.push(byte);
            out(byte);
        }
    }

    /// Count how many bytes of `ahead` match the dictionary contents starting
    /// at `index`, taking the wrap around into account.
    pub(crate) fn match_len(&self, index: usize, ahead: &[u8]) -> usize {
        ahead
            .iter()
            .enumerate()
            .take_while(|&(k, &b)| self.get(index + k) == b)
            .count()
    }

    /// Does reading `length` bytes from `index` touch any byte that writing
    /// `length` bytes at the cursor would replace?
    pub(crate) fn overlaps_write(&self, index: usize, length: usize) -> bool {
        if length == 0 {
            return false;
        }
        let fwd = (index + WINDOW_SIZE - self.csr) % WINDOW_SIZE;
        let back = (self.csr + WINDOW_SIZE - index) % WINDOW_SIZE;

        fwd < length || back < length
    }
}

impl std::fmt::Debug for RollingDict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RollingDict")
            .field("csr", &self.csr)
            .finish()
    }
}
