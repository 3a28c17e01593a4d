//! Physical memory mapping through `/dev/mem`
//!
//! Mapping sequence for one peripheral block:
//!
//! ```text
//! open(/dev/mem, O_RDWR | O_SYNC)                      → DevMem
//! mmap(NULL, size + page, PROT_NONE, anonymous)        → reservation
//! round reservation start up to the next page boundary → aligned
//! mmap(aligned, size, RW, MAP_SHARED | MAP_FIXED, fd, physical_base)
//! ```
//!
//! The reservation is address space only. The fixed mapping replaces part of
//! it, and [`MappedRegion`] releases the whole reservation on drop.
//!
//! Opening `/dev/mem` requires root (or `CAP_SYS_RAWIO`). Any regular file can
//! stand in for it, which is how the tests map synthetic "physical memory".

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use thiserror::Error;

use crate::config::{DEFAULT_PAGE_SIZE, DEV_MEM_PATH};
use crate::mmio::{check_index, RegisterWindow, WindowError, WORD_BYTES};

/// Setup-time mapping failures. All of them are fatal for the bring-up tool.
#[derive(Debug, Error)]
pub enum MapError {
    /// The physical-memory device could not be opened (usually missing privileges).
    #[error("can't open {}: {source}", path.display())]
    DeviceOpen {
        /// Device path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The page-alignment reservation could not be allocated.
    #[error("allocation error reserving {size} bytes: {source}")]
    Allocation {
        /// Requested reservation size in bytes.
        size: usize,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The fixed shared mapping was refused.
    #[error("mmap error mapping {size} bytes at physical {physical_base:#010x}: {source}")]
    Mapping {
        /// Physical base address.
        physical_base: u64,
        /// Mapping length in bytes.
        size: usize,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Base or size cannot describe a register block.
    #[error("invalid region {physical_base:#010x} + {size:#x}: {reason}")]
    InvalidRegion {
        /// Physical base address.
        physical_base: u64,
        /// Mapping length in bytes.
        size: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// System page size, falling back to 4 KiB if `sysconf` has no answer.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions and does not touch memory we own.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(raw)
        .ok()
        .filter(|&size| size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// Round `addr` up to a multiple of `align` (a power of two).
fn align_up(addr: usize, align: usize) -> Option<usize> {
    let mask = align.checked_sub(1)?;
    addr.checked_add(mask).map(|end| end & !mask)
}

/// Open handle on the physical-memory device.
///
/// One handle serves any number of [`MappedRegion`]s. Closed on drop; regions
/// already mapped stay valid after that.
#[derive(Debug)]
pub struct DevMem {
    file: File,
    path: PathBuf,
}

impl DevMem {
    /// Default physical-memory device.
    pub const DEFAULT_PATH: &'static str = DEV_MEM_PATH;

    /// Open `path` for synchronous read/write access.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&path)
            .map_err(|source| MapError::DeviceOpen {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("opened {}", path.display());
        Ok(Self { file, path })
    }

    /// Device path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map `size` bytes of physical memory starting at `physical_base`.
    ///
    /// `physical_base` must be page aligned and `size` a non-zero multiple of
    /// the register width.
    pub fn open_peripheral(&self, physical_base: u64, size: usize) -> Result<MappedRegion, MapError> {
        let page = page_size();
        let invalid = |reason| MapError::InvalidRegion {
            physical_base,
            size,
            reason,
        };

        if size == 0 || size % WORD_BYTES != 0 {
            return Err(invalid("size must be a non-zero multiple of 4 bytes"));
        }
        let page_u64 = u64::try_from(page).map_err(|_| invalid("page size overflows u64"))?;
        if physical_base % page_u64 != 0 {
            return Err(invalid("physical base is not page aligned"));
        }
        let offset =
            mmap_offset(physical_base).ok_or_else(|| invalid("physical base exceeds the mmap offset type"))?;

        let reservation = Reservation::new(size, page)?;
        let aligned = align_up(reservation.start(), page)
            .ok_or_else(|| invalid("aligned start overflows the address space"))?;

        // SAFETY: `aligned .. aligned + size` lies inside `reservation`, which
        // this function owns; MAP_FIXED only replaces pages of that reservation.
        let mapped = unsafe {
            mmap_shared_fixed(
                aligned as *mut libc::c_void,
                size,
                self.file.as_raw_fd(),
                offset,
            )
        };
        if mapped == libc::MAP_FAILED {
            return Err(MapError::Mapping {
                physical_base,
                size,
                source: io::Error::last_os_error(),
            });
        }
        let regs = NonNull::new(mapped.cast::<u32>()).ok_or_else(|| MapError::Mapping {
            physical_base,
            size,
            source: io::Error::other("mmap returned a null mapping"),
        })?;

        tracing::info!(
            "mapped {size:#x} bytes of physical {physical_base:#010x} at {:#x}",
            regs.as_ptr() as usize
        );

        Ok(MappedRegion {
            physical_base,
            len: size,
            regs,
            _reservation: reservation,
        })
    }
}

/// Map one peripheral block through the default `/dev/mem` device.
///
/// Convenience for single-region callers; the device handle is closed again
/// once the mapping exists.
pub fn open_peripheral(physical_base: u64, size: usize) -> Result<MappedRegion, MapError> {
    open_peripheral_at(DevMem::DEFAULT_PATH, physical_base, size)
}

/// [`open_peripheral`] through an explicit device path.
pub fn open_peripheral_at(
    device: impl AsRef<Path>,
    physical_base: u64,
    size: usize,
) -> Result<MappedRegion, MapError> {
    DevMem::open(device)?.open_peripheral(physical_base, size)
}

/// File offset type of the mmap call: 64-bit on glibc even where `off_t` is
/// 32-bit, so peripheral bases above 2 GiB (BCM2711) stay reachable.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
type MmapOffset = libc::off64_t;

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
type MmapOffset = libc::off_t;

/// Physical base as an mmap offset, `None` if it does not fit.
fn mmap_offset(physical_base: u64) -> Option<MmapOffset> {
    MmapOffset::try_from(physical_base).ok()
}

/// `mmap(addr, len, PROT_READ | PROT_WRITE, MAP_SHARED | MAP_FIXED, fd, offset)`.
///
/// # Safety
///
/// `addr .. addr + len` must be address space owned by the caller; MAP_FIXED
/// discards whatever was mapped there.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
unsafe fn mmap_shared_fixed(
    addr: *mut libc::c_void,
    len: usize,
    fd: libc::c_int,
    offset: MmapOffset,
) -> *mut libc::c_void {
    // SAFETY: forwarded from the caller's contract.
    unsafe {
        libc::mmap64(
            addr,
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_FIXED,
            fd,
            offset,
        )
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
unsafe fn mmap_shared_fixed(
    addr: *mut libc::c_void,
    len: usize,
    fd: libc::c_int,
    offset: MmapOffset,
) -> *mut libc::c_void {
    // SAFETY: forwarded from the caller's contract.
    unsafe {
        libc::mmap(
            addr,
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_FIXED,
            fd,
            offset,
        )
    }
}

/// Anonymous, inaccessible address-space reservation (`size + page` bytes).
#[derive(Debug)]
struct Reservation {
    ptr: NonNull<libc::c_void>,
    len: usize,
}

impl Reservation {
    fn new(size: usize, page: usize) -> Result<Self, MapError> {
        let len = size.checked_add(page).ok_or_else(|| MapError::Allocation {
            size,
            source: io::Error::new(io::ErrorKind::OutOfMemory, "reservation size overflows"),
        })?;
        // SAFETY: anonymous PROT_NONE mapping at a kernel-chosen address; no
        // existing memory is affected.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(MapError::Allocation {
                size: len,
                source: io::Error::last_os_error(),
            });
        }
        let ptr = NonNull::new(raw).ok_or_else(|| MapError::Allocation {
            size: len,
            source: io::Error::other("mmap returned a null reservation"),
        })?;
        Ok(Self { ptr, len })
    }

    fn start(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // SAFETY: `ptr .. ptr + len` was returned by mmap in `new` and is only
        // unmapped here. Any fixed mapping inside it goes with it.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr(), self.len) };
        if rc != 0 {
            tracing::warn!(
                "munmap of {:#x} (+{:#x}) failed: {}",
                self.start(),
                self.len,
                io::Error::last_os_error()
            );
        }
    }
}

/// A peripheral register block mapped into this process.
///
/// Implements [`RegisterWindow`] with `read_volatile` / `write_volatile`.
/// The mapping is released when the region is dropped.
#[derive(Debug)]
pub struct MappedRegion {
    physical_base: u64,
    len: usize,
    regs: NonNull<u32>,
    _reservation: Reservation,
}

impl MappedRegion {
    /// Physical address of word 0.
    pub fn physical_base(&self) -> u64 {
        self.physical_base
    }

    /// Mapped length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: zero-length regions are rejected at mapping time.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl RegisterWindow for MappedRegion {
    fn words(&self) -> usize {
        self.len / WORD_BYTES
    }

    fn base_address(&self) -> usize {
        self.regs.as_ptr() as usize
    }

    fn read(&self, index: usize) -> Result<u32, WindowError> {
        check_index(index, self.words())?;
        // SAFETY: index < words, so the word lies inside the live mapping.
        Ok(unsafe { ptr::read_volatile(self.regs.as_ptr().add(index)) })
    }

    fn write(&self, index: usize, value: u32) -> Result<(), WindowError> {
        check_index(index, self.words())?;
        // SAFETY: index < words, so the word lies inside the live mapping.
        unsafe { ptr::write_volatile(self.regs.as_ptr().add(index), value) };
        Ok(())
    }
}
