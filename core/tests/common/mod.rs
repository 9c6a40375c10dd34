//! Common test utilities: fake provisioner, boot environment and invoker

#![allow(dead_code)]

pub mod builder;
pub use builder::ElfBuilder;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::Rc;

use lodestar_core::dispatch::{EntryAbi, EntryInvoker};
use lodestar_core::error::{BootError, Result};
use lodestar_core::handoff::{
    BootEnvironment, GraphicsDescriptor, HandoffContext, MapKey, MemoryMapInfo,
    MemoryMapSnapshot, RuntimeServicesHandle,
};
use lodestar_core::memory::{AddressRange, MemoryProvisioner, ProvisionError, ProvisionRequest};

pub const EFI_NOT_FOUND: usize = (1 << 63) | 14;
pub const EFI_INVALID_PARAMETER: usize = (1 << 63) | 2;

/// Fill byte for freshly provisioned memory, so missing zero-fill shows.
pub const POISON: u8 = 0xAA;

/// Provisioner backed by heap buffers. Every grant is recorded.
#[derive(Debug)]
pub struct FakeProvisioner {
    pub granularity: u64,
    pub requests: Vec<ProvisionRequest>,
    regions: Vec<(AddressRange, Vec<u8>)>,
    /// Fail the request with this index
    pub fail_at: Option<usize>,
    /// Added to every granted base
    pub skew: u64,
}

impl FakeProvisioner {
    pub fn new(granularity: u64) -> Self {
        Self {
            granularity,
            requests: Vec::new(),
            regions: Vec::new(),
            fail_at: None,
            skew: 0,
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn skewed(mut self, skew: u64) -> Self {
        self.skew = skew;
        self
    }

    pub fn requested_ranges(&self) -> Vec<AddressRange> {
        self.requests.iter().map(|r| r.range).collect()
    }

    /// Contents of `[addr, addr + len)` from the latest region covering it.
    pub fn read(&self, addr: u64, len: u64) -> Vec<u8> {
        let range = AddressRange::new(addr, len).expect("range");
        let (region, bytes) = self
            .regions
            .iter()
            .rev()
            .find(|(region, _)| region.covers(&range))
            .expect("address was never provisioned");
        let start = (addr - region.start()) as usize;
        bytes[start..start + len as usize].to_vec()
    }
}

impl MemoryProvisioner for FakeProvisioner {
    fn granularity(&self) -> u64 {
        self.granularity
    }

    fn allocate(&mut self, request: &ProvisionRequest) -> std::result::Result<u64, ProvisionError> {
        let index = self.requests.len();
        self.requests.push(*request);
        if self.fail_at == Some(index) {
            return Err(ProvisionError::OutOfMemory);
        }
        self.regions
            .push((request.range, vec![POISON; request.range.len() as usize]));
        Ok(request.range.start() + self.skew)
    }

    unsafe fn destination(&mut self, range: AddressRange) -> &mut [u8] {
        if range.is_empty() {
            return &mut [];
        }
        let (region, bytes) = self
            .regions
            .iter_mut()
            .rev()
            .find(|(region, _)| region.covers(&range))
            .expect("destination outside provisioned memory");
        let start = (range.start() - region.start()) as usize;
        &mut bytes[start..start + range.len() as usize]
    }
}

/// One collaborator call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadFile(String),
    Graphics,
    RuntimeServices,
    GetMemoryMap,
    Relinquish(usize),
    Invoke(EntryAbi),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub const MAP_KEY: usize = 0x5150;
pub const DESCRIPTOR_SIZE: usize = 48;
pub const RUNTIME_SERVICES: usize = 0x7fe0_0000;

/// In-memory stand-in for firmware boot services.
pub struct FakeEnvironment {
    files: HashMap<String, Vec<u8>>,
    map: Vec<u8>,
    log: CallLog,
    /// Base address of every buffer handed out by `read_file`
    pub served: Vec<(String, u64)>,
    pub graphics: GraphicsDescriptor,
    pub fail_memory_map: Option<usize>,
    pub fail_relinquish: Option<usize>,
}

impl FakeEnvironment {
    pub fn new(log: &CallLog) -> Self {
        Self {
            files: HashMap::new(),
            map: vec![0u8; DESCRIPTOR_SIZE * 4],
            log: Rc::clone(log),
            served: Vec::new(),
            graphics: GraphicsDescriptor {
                base: 0x8000_0000,
                size: 1024 * 768 * 4,
                width: 1024,
                height: 768,
                pixels_per_scanline: 1024,
            },
            fail_memory_map: None,
            fail_relinquish: None,
        }
    }

    pub fn with_file(mut self, path: &str, contents: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), contents);
        self
    }

    pub fn failing_relinquish(mut self, status: usize) -> Self {
        self.fail_relinquish = Some(status);
        self
    }

    pub fn failing_memory_map(mut self, status: usize) -> Self {
        self.fail_memory_map = Some(status);
        self
    }

    pub fn map_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }
}

impl BootEnvironment for FakeEnvironment {
    fn read_file(&mut self, path: &str, limit: usize) -> Result<&'static [u8]> {
        self.log.borrow_mut().push(Call::ReadFile(path.to_string()));
        let contents = self.files.get(path).ok_or(BootError::FileRead(EFI_NOT_FOUND))?;
        if contents.len() > limit {
            return Err(BootError::FileRead(EFI_INVALID_PARAMETER));
        }
        let leaked: &'static [u8] = Box::leak(contents.clone().into_boxed_slice());
        self.served.push((path.to_string(), leaked.as_ptr() as u64));
        Ok(leaked)
    }

    fn graphics(&mut self) -> GraphicsDescriptor {
        self.log.borrow_mut().push(Call::Graphics);
        self.graphics
    }

    fn runtime_services(&self) -> RuntimeServicesHandle {
        self.log.borrow_mut().push(Call::RuntimeServices);
        RuntimeServicesHandle::new(RUNTIME_SERVICES as *const c_void)
    }

    fn get_memory_map(&mut self) -> Result<MemoryMapSnapshot> {
        self.log.borrow_mut().push(Call::GetMemoryMap);
        if let Some(status) = self.fail_memory_map {
            return Err(BootError::MemoryMap(status));
        }
        Ok(MemoryMapSnapshot {
            info: MemoryMapInfo {
                descriptors: self.map.as_ptr(),
                map_size: self.map.len(),
                descriptor_size: DESCRIPTOR_SIZE,
                descriptor_version: 1,
            },
            key: MapKey(MAP_KEY),
        })
    }

    fn relinquish(&mut self, key: MapKey) -> Result<()> {
        self.log.borrow_mut().push(Call::Relinquish(key.0));
        if let Some(status) = self.fail_relinquish {
            return Err(BootError::RelinquishFailure(status));
        }
        if key.0 != MAP_KEY {
            return Err(BootError::RelinquishFailure(EFI_INVALID_PARAMETER));
        }
        Ok(())
    }
}

/// Records the jump instead of taking it.
pub struct RecordingInvoker {
    log: CallLog,
    pub result: i32,
    pub scratch: Option<i32>,
    pub context: Option<HandoffContext>,
}

impl RecordingInvoker {
    pub fn new(log: &CallLog, result: i32) -> Self {
        Self {
            log: Rc::clone(log),
            result,
            scratch: None,
            context: None,
        }
    }

    pub fn invoked(&self) -> bool {
        self.log
            .borrow()
            .iter()
            .any(|call| matches!(call, Call::Invoke(_)))
    }
}

impl EntryInvoker for RecordingInvoker {
    unsafe fn invoke(&mut self, abi: EntryAbi, argument: *mut c_void) -> Result<i32> {
        self.log.borrow_mut().push(Call::Invoke(abi));
        match abi {
            EntryAbi::Scratch { .. } => self.scratch = Some(*(argument as *const i32)),
            EntryAbi::SysV64Handoff { .. } | EntryAbi::Win64Handoff { .. } => {
                self.context = Some(*(argument as *const HandoffContext))
            }
        }
        Ok(self.result)
    }
}
