//! Host-side test doubles
//!
//! Only built for `cargo test`. Provides a page-map address space, an
//! in-memory filesystem and a host whose `spawn` runs child programs on
//! real threads so the exec/wait/exit handshake runs concurrently.

use std::collections::{BTreeMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use spin::Mutex;

use crate::fs::FileSystem;
use crate::host::Host;
use crate::kernel::Kernel;
use crate::mm::{AddressSpace, KernelAddr, Mapping, PageFlags, UserAddr, PAGE_SIZE, USER_TOP};
use crate::process::{ParentLink, Pid, Process};
use crate::syscall::KILLED_STATUS;
use crate::trap::{Disposition, TrapFrame};

/// Start of the two writable scratch pages every test process gets.
pub const SCRATCH: usize = 0x0804_8000;
/// User stack pointer used for syscall frames.
pub const ESP: usize = USER_TOP - 64;

struct Page {
    frame: NonNull<[u8; PAGE_SIZE]>,
    flags: PageFlags,
}

impl Drop for Page {
    fn drop(&mut self) {
        // SAFETY: The frame came from Box::into_raw in PageMap::map.
        unsafe { drop(Box::from_raw(self.frame.as_ptr())) }
    }
}

/// A software page directory.
pub struct PageMap {
    pages: BTreeMap<usize, Page>,
}

// SAFETY: Frames are uniquely owned by the map.
unsafe impl Send for PageMap {}

impl PageMap {
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }

    /// Two scratch data pages plus the top stack page.
    pub fn with_user_layout() -> Self {
        let mut map = Self::new();
        map.map(UserAddr::new(SCRATCH), PageFlags::USER_DATA);
        map.map(UserAddr::new(SCRATCH + PAGE_SIZE), PageFlags::USER_DATA);
        map.map(UserAddr::new(USER_TOP - PAGE_SIZE), PageFlags::USER_DATA);
        map
    }

    /// Map a zeroed page at the page containing `addr`.
    pub fn map(&mut self, addr: UserAddr, flags: PageFlags) {
        let frame = Box::into_raw(Box::new([0u8; PAGE_SIZE]));
        let frame = NonNull::new(frame).expect("Box::into_raw is never null");
        self.pages.insert(addr.page_number(), Page { frame, flags });
    }

    fn byte_ptr(&self, addr: UserAddr) -> *mut u8 {
        let page = self
            .pages
            .get(&addr.page_number())
            .unwrap_or_else(|| panic!("test touched unmapped {:?}", addr));
        // SAFETY: page_offset is always inside the frame.
        unsafe { page.frame.as_ptr().cast::<u8>().add(addr.page_offset()) }
    }

    /// Poke bytes into user memory, ignoring page permissions.
    pub fn write_bytes(&mut self, addr: UserAddr, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let ptr = self.byte_ptr(UserAddr::new(addr.as_usize() + i));
            // SAFETY: byte_ptr points into a live frame we own.
            unsafe { ptr.write(byte) }
        }
    }

    /// Peek bytes out of user memory.
    pub fn read_bytes(&self, addr: UserAddr, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let ptr = self.byte_ptr(UserAddr::new(addr.as_usize() + i));
                // SAFETY: byte_ptr points into a live frame we own.
                unsafe { ptr.read() }
            })
            .collect()
    }
}

// SAFETY: Every translation points into a whole, uniquely owned frame that
// lives as long as the map, and each page has its own frame.
unsafe impl AddressSpace for PageMap {
    fn translate(&self, addr: UserAddr) -> Option<Mapping> {
        let page = self.pages.get(&addr.page_number())?;
        // SAFETY: page_offset is always inside the frame.
        let ptr = unsafe { page.frame.as_ptr().cast::<u8>().add(addr.page_offset()) };
        Some(Mapping {
            kaddr: KernelAddr::new(NonNull::new(ptr)?),
            flags: page.flags,
        })
    }
}

/// An open in-memory file.
#[derive(Debug)]
pub struct MemFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
}

/// In-memory filesystem with fixed-size files.
#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, Arc<Mutex<Vec<u8>>>>,
    open_handles: usize,
    closes: usize,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.files
            .insert(name.to_string(), Arc::new(Mutex::new(contents.to_vec())));
        self
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.open_handles
    }

    /// Total number of close calls.
    pub fn closes(&self) -> usize {
        self.closes
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).map(|data| data.lock().clone())
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        if name.is_empty() || self.files.contains_key(name) {
            return false;
        }
        let data = vec![0u8; initial_size as usize];
        self.files.insert(name.to_string(), Arc::new(Mutex::new(data)));
        true
    }

    fn remove(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }

    fn open(&mut self, name: &str) -> Option<MemFile> {
        let data = Arc::clone(self.files.get(name)?);
        self.open_handles += 1;
        Some(MemFile { data, pos: 0 })
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> usize {
        let data = file.data.lock();
        let start = file.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n;
        n
    }

    fn write(&mut self, file: &mut MemFile, buf: &[u8]) -> usize {
        let mut data = file.data.lock();
        let start = file.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        file.pos += n;
        n
    }

    fn length(&mut self, file: &MemFile) -> u32 {
        file.data.lock().len() as u32
    }

    fn seek(&mut self, file: &mut MemFile, position: u32) {
        file.pos = position as usize;
    }

    fn tell(&mut self, file: &MemFile) -> u32 {
        file.pos as u32
    }

    fn close(&mut self, file: MemFile) {
        self.open_handles -= 1;
        self.closes += 1;
        drop(file);
    }
}

/// A user program run by `TestHost::spawn`. Returns its exit status.
pub type Program = fn(&'static Kernel<TestHost>, &mut Process<TestHost>) -> i32;

/// Host whose processes are threads.
pub struct TestHost {
    kernel: OnceLock<&'static Kernel<TestHost>>,
    programs: BTreeMap<&'static str, Program>,
    next_pid: AtomicU32,
    console_out: Mutex<Vec<u8>>,
    console_writes: Mutex<Vec<Vec<u8>>>,
    console_in: Mutex<VecDeque<u8>>,
    powered_off: AtomicBool,
    spawned: AtomicUsize,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            kernel: OnceLock::new(),
            programs: BTreeMap::new(),
            next_pid: AtomicU32::new(2),
            console_out: Mutex::new(Vec::new()),
            console_writes: Mutex::new(Vec::new()),
            console_in: Mutex::new(VecDeque::new()),
            powered_off: AtomicBool::new(false),
            spawned: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_program(mut self, name: &'static str, program: Program) -> Self {
        self.programs.insert(name, program);
        self
    }

    pub fn with_input(self, input: &[u8]) -> Self {
        self.console_in.lock().extend(input.iter().copied());
        self
    }

    pub fn console_output(&self) -> String {
        String::from_utf8_lossy(&self.console_out.lock()).into_owned()
    }

    pub fn console_writes(&self) -> Vec<Vec<u8>> {
        self.console_writes.lock().clone()
    }

    pub fn pending_input(&self) -> usize {
        self.console_in.lock().len()
    }

    pub fn powered_off(&self) -> bool {
        self.powered_off.load(Ordering::SeqCst)
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Join every child thread, including ones spawned by children.
    pub fn join_children(&self) {
        loop {
            let handles: Vec<_> = self.threads.lock().drain(..).collect();
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                handle.join().expect("child program panicked");
            }
        }
    }
}

impl Host for TestHost {
    type Fs = MemFs;
    type Space = PageMap;

    fn spawn(&self, cmdline: &str, parent: ParentLink) -> Option<Pid> {
        let kernel = *self.kernel.get()?;
        let pid = Pid::from_raw(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let program = cmdline
            .split_whitespace()
            .next()
            .and_then(|name| self.programs.get(name).copied());
        let cmdline = cmdline.to_string();

        let handle = thread::spawn(move || {
            let mut process = Process::new(pid, &cmdline, PageMap::with_user_layout(), Some(parent));
            let Some(program) = program else {
                process.report_load(false);
                kernel.exit(&mut process, KILLED_STATUS);
                return;
            };
            process.report_load(true);
            let status = program(kernel, &mut process);
            kernel.exit(&mut process, status);
        });

        self.spawned.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().push(handle);
        Some(pid)
    }

    fn yield_now(&self) {
        thread::yield_now();
    }

    fn console_write(&self, bytes: &[u8]) {
        self.console_out.lock().extend_from_slice(bytes);
        self.console_writes.lock().push(bytes.to_vec());
    }

    fn console_read_byte(&self) -> u8 {
        self.console_in.lock().pop_front().unwrap_or(0)
    }

    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }
}

/// Build a kernel that lives for the rest of the test binary.
pub fn boot(host: TestHost, fs: MemFs) -> &'static Kernel<TestHost> {
    let kernel: &'static Kernel<TestHost> = Box::leak(Box::new(Kernel::new(host, fs)));
    let _ = kernel.host().kernel.set(kernel);
    kernel
}

/// A parentless process with the standard layout.
pub fn root_process(pid: u32) -> Process<TestHost> {
    Process::new(Pid::from_raw(pid), "main", PageMap::with_user_layout(), None)
}

/// Write a NUL-terminated string into user memory; returns its address.
pub fn place_str(process: &mut Process<TestHost>, addr: usize, s: &str) -> u32 {
    let map = process.space_mut();
    map.write_bytes(UserAddr::new(addr), s.as_bytes());
    map.write_bytes(UserAddr::new(addr + s.len()), &[0]);
    addr as u32
}

/// Lay out a syscall on the user stack and build its trap frame.
pub fn frame_for(map: &mut PageMap, esp: usize, nr: u32, args: &[u32]) -> TrapFrame {
    map.write_bytes(UserAddr::new(esp), &nr.to_le_bytes());
    for (i, arg) in args.iter().enumerate() {
        map.write_bytes(UserAddr::new(esp + 4 * (i + 1)), &arg.to_le_bytes());
    }
    TrapFrame::new(esp as u32)
}

/// Issue a syscall from `process`; returns the disposition and return slot.
pub fn syscall(
    kernel: &Kernel<TestHost>,
    process: &mut Process<TestHost>,
    nr: u32,
    args: &[u32],
) -> (Disposition, i32) {
    let mut frame = frame_for(process.space_mut(), ESP, nr, args);
    let disposition = kernel.handle_syscall(process, &mut frame);
    (disposition, frame.return_value())
}
