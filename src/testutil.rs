//! In-memory `DeviceLink`/`DeviceEnumerator` pair used across this crate's
//! unit tests: a fake transport that records exactly what was sent to it
//! and can be inspected afterward, instead of mocking at the level of
//! individual assertions.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::constants::{address, register, ERASED_WORD, PAGE_SIZE};
use crate::device::{
    DeviceDescriptor, DeviceEnumerator, DeviceLink, DeviceType, Direction, LinkError,
    SerialNumber, Transport,
};

#[derive(Debug, Clone)]
pub struct RwManyCall {
    pub addresses: Vec<u32>,
    pub directions: Vec<Direction>,
    pub counts: Vec<usize>,
    pub values: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct WriteManyCall {
    pub addresses: Vec<u32>,
    pub values: Vec<u32>,
}

/// A flash array plus register state, driven exactly the way a real T7
/// would respond to the frame sequences this crate issues.
pub struct MockDeviceLink {
    flash: HashMap<u32, u32>,
    read_ptr: u32,
    write_ptr: u32,
    named_registers: HashMap<String, u32>,
    rw_many_calls: Vec<RwManyCall>,
    write_many_calls: Vec<WriteManyCall>,
    single_writes: Vec<(u32, u32)>,
}

impl MockDeviceLink {
    pub fn new() -> Self {
        MockDeviceLink {
            flash: HashMap::new(),
            read_ptr: 0,
            write_ptr: 0,
            named_registers: HashMap::new(),
            rw_many_calls: Vec::new(),
            write_many_calls: Vec::new(),
            single_writes: Vec::new(),
        }
    }

    /// Seeds flash words starting at `start_address` (byte address).
    pub fn fill_flash(&mut self, start_address: u32, words: &[u32]) {
        for (i, &word) in words.iter().enumerate() {
            self.flash.insert(start_address + (i * 4) as u32, word);
        }
    }

    pub fn set_named_register(&mut self, name: &str, value: u32) {
        self.named_registers.insert(name.to_string(), value);
    }

    pub fn rw_many_calls(&self) -> &[RwManyCall] {
        &self.rw_many_calls
    }

    pub fn write_many_calls(&self) -> &[WriteManyCall] {
        &self.write_many_calls
    }

    pub fn single_writes(&self) -> &[(u32, u32)] {
        &self.single_writes
    }

    fn word_at(&self, address: u32) -> u32 {
        *self.flash.get(&address).unwrap_or(&ERASED_WORD)
    }

    fn erase_page(&mut self, page_base: u32) {
        let words_per_page = PAGE_SIZE / 4;
        for i in 0..words_per_page {
            self.flash.insert(page_base + i * 4, ERASED_WORD);
        }
    }
}

impl Default for MockDeviceLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for MockDeviceLink {
    fn write(&mut self, address: u32, value: u32) -> Result<(), LinkError> {
        self.single_writes.push((address, value));
        Ok(())
    }

    fn write_many(&mut self, addresses: &[u32], values: &[u32]) -> Result<(), LinkError> {
        self.write_many_calls.push(WriteManyCall {
            addresses: addresses.to_vec(),
            values: values.to_vec(),
        });

        if addresses == [address::EXF_KEY, address::EXF_ERASE] {
            self.erase_page(values[1]);
        }

        Ok(())
    }

    fn rw_many(
        &mut self,
        addresses: &[u32],
        directions: &[Direction],
        counts: &[usize],
        values: &[u32],
    ) -> Result<Vec<u32>, LinkError> {
        self.rw_many_calls.push(RwManyCall {
            addresses: addresses.to_vec(),
            directions: directions.to_vec(),
            counts: counts.to_vec(),
            values: values.to_vec(),
        });

        let mut value_idx = 0;
        let mut output = Vec::new();

        for (i, &addr) in addresses.iter().enumerate() {
            let count = counts[i];

            match directions[i] {
                Direction::Write => {
                    let frame = &values[value_idx..value_idx + count];
                    value_idx += count;

                    if addr == address::EXF_P_READ {
                        self.read_ptr = frame[0];
                    } else if addr == address::EXF_P_WRITE {
                        self.write_ptr = frame[0];
                    } else if addr == address::EXF_WRITE {
                        for (j, &word) in frame.iter().enumerate() {
                            self.flash.insert(self.write_ptr + (j * 4) as u32, word);
                        }
                        self.write_ptr += (count * 4) as u32;
                    }
                    // EXF_KEY frames are accepted and otherwise ignored - the
                    // mock doesn't model lock/unlock state.
                }
                Direction::Read => {
                    value_idx += count;

                    if addr == address::EXF_READ {
                        for j in 0..count {
                            output.push(self.word_at(self.read_ptr + (j * 4) as u32));
                        }
                        self.read_ptr += (count * 4) as u32;
                    }
                }
            }
        }

        Ok(output)
    }

    fn read_named(&mut self, name: &str) -> Result<u32, LinkError> {
        self.named_registers
            .get(name)
            .copied()
            .ok_or(LinkError::NotFound)
    }

    fn close(self: Box<Self>) -> Result<(), LinkError> {
        Ok(())
    }
}

/// A scripted enumerator: each call to `list_all` pops the next scheduled
/// response, letting reboot/rediscovery tests simulate "not found yet,
/// then found" without a real bus scan.
pub struct MockEnumerator {
    responses: RefCell<Vec<Vec<DeviceDescriptor>>>,
    reopened_version: u32,
}

impl MockEnumerator {
    pub fn new(responses: Vec<Vec<DeviceDescriptor>>, reopened_firmware_version: u32) -> Self {
        MockEnumerator {
            responses: RefCell::new(responses),
            reopened_version: reopened_firmware_version,
        }
    }
}

impl DeviceEnumerator for MockEnumerator {
    fn list_all(
        &self,
        _device_type: DeviceType,
        _transport: Transport,
    ) -> Result<Vec<DeviceDescriptor>, LinkError> {
        let mut responses = self.responses.borrow_mut();

        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(responses.remove(0))
        }
    }

    fn open_by_type(
        &self,
        _device_type: DeviceType,
        _transport: Transport,
        serial: &SerialNumber,
    ) -> Result<Box<dyn DeviceLink>, LinkError> {
        let mut link = MockDeviceLink::new();
        link.set_named_register(register::FIRMWARE_VERSION, self.reopened_version);
        link.set_named_register(register::SERIAL_NUMBER, serial.0);

        Ok(Box::new(link))
    }
}
