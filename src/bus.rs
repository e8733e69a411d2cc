/*
  _______________ $10000
 |               |
 | Free RAM      |
 |_ _ _ _ _ _ _ _| $0600  <- programs are loaded here
 | Free RAM      |
 |_______________| $0200
 | Stack         |
 |_______________| $0100
 | Zero Page     |  <- countdown lands at $10..$19
 |_______________| $0000
*/

const RAM_SIZE: usize = 0x10000;

pub struct Bus {
    ram: Box<[u8; RAM_SIZE]>,
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            ram: Box::new([0; RAM_SIZE]),
        }
    }

    pub fn cpu_read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }

    pub fn cpu_write_batch(&mut self, start_addr: u16, data: &[u8]) -> Result<(), String> {
        let end = start_addr as usize + data.len();
        if end > RAM_SIZE {
            return Err(format!(
                "{} bytes at ${:04X} run past the end of memory",
                data.len(),
                start_addr
            ));
        }
        self.ram[start_addr as usize..end].copy_from_slice(data);
        Ok(())
    }

    /// Borrow `len` bytes starting at `start`, clamped to the end of memory.
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = start as usize;
        let end = (start + len).min(RAM_SIZE);
        &self.ram[start..end]
    }
}

impl Default for Bus {
    fn default() -> Bus {
        Bus::new()
    }
}
