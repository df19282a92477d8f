//! Linear framebuffer surface.
//!
//! Wraps a read-write memory mapping of a fbdev device. Geometry comes from
//! the `FBIOGET_VSCREENINFO`/`FBIOGET_FSCREENINFO` ioctls; `line_length` is
//! authoritative for row stride and may exceed `width * bytes_per_pixel`.
//! Only 32-bpp little-endian layouts render correctly, which covers every
//! contemporary fbdev driver; anything else gets a warning at open time.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::{MmapMut, MmapOptions};

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

// Mirrors of the linux/fb.h ioctl structs. Field order and widths must match
// the kernel ABI exactly; only a handful of fields are consumed.

#[repr(C)]
#[derive(Default)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

#[repr(C)]
#[derive(Default)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

#[repr(C)]
#[derive(Default)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

pub struct Framebuffer {
    map: MmapMut,
    width: i32,
    height: i32,
    bytes_per_pixel: usize,
    line_length: usize,
}

impl Framebuffer {
    /// Open and map a framebuffer device (startup-fatal on any failure).
    pub fn open(device: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .with_context(|| format!("failed to open framebuffer {}", device.display()))?;
        let fd = file.as_raw_fd();

        let mut vinfo = FbVarScreeninfo::default();
        // SAFETY: fd is a live framebuffer descriptor and the struct mirrors
        // the kernel layout the ioctl writes into.
        if unsafe { libc::ioctl(fd, FBIOGET_VSCREENINFO, &mut vinfo) } < 0 {
            bail!(
                "FBIOGET_VSCREENINFO on {}: {}",
                device.display(),
                std::io::Error::last_os_error()
            );
        }
        let mut finfo = FbFixScreeninfo::default();
        // SAFETY: as above.
        if unsafe { libc::ioctl(fd, FBIOGET_FSCREENINFO, &mut finfo) } < 0 {
            bail!(
                "FBIOGET_FSCREENINFO on {}: {}",
                device.display(),
                std::io::Error::last_os_error()
            );
        }

        if vinfo.bits_per_pixel != 32 {
            tracing::warn!(
                "framebuffer is {}bpp; only 32bpp renders correctly",
                vinfo.bits_per_pixel
            );
        }

        // SAFETY: mapping a device file we hold open read-write; the kernel
        // owns the backing store, there is no aliasing Rust allocation.
        let map = unsafe {
            MmapOptions::new()
                .len(finfo.smem_len as usize)
                .map_mut(&file)
        }
        .with_context(|| format!("failed to mmap framebuffer {}", device.display()))?;

        tracing::info!(
            "framebuffer {}: {}x{} {}bpp, stride {} bytes, {} bytes mapped",
            device.display(),
            vinfo.xres,
            vinfo.yres,
            vinfo.bits_per_pixel,
            finfo.line_length,
            finfo.smem_len
        );

        Ok(Self {
            map,
            width: vinfo.xres as i32,
            height: vinfo.yres as i32,
            bytes_per_pixel: (vinfo.bits_per_pixel / 8).max(1) as usize,
            line_length: finfo.line_length as usize,
        })
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// Write one pixel. Out-of-bounds coordinates are ignored, and the byte
    /// offset is checked against the mapping so a lying `line_length` cannot
    /// push a write past the end.
    pub fn put_pixel(&mut self, x: i32, y: i32, rgb: u32) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let offset = y as usize * self.line_length + x as usize * self.bytes_per_pixel;
        if let Some(dst) = self.map.get_mut(offset..offset + 4) {
            dst.copy_from_slice(&rgb.to_le_bytes());
        }
    }

    /// Paint the whole surface one color, a row at a time.
    pub fn clear(&mut self, rgb: u32) {
        if self.bytes_per_pixel != 4 {
            for y in 0..self.height {
                for x in 0..self.width {
                    self.put_pixel(x, y, rgb);
                }
            }
            return;
        }
        let mut row = Vec::with_capacity(self.width as usize * 4);
        for _ in 0..self.width {
            row.extend_from_slice(&rgb.to_le_bytes());
        }
        for y in 0..self.height as usize {
            let offset = y * self.line_length;
            if let Some(dst) = self.map.get_mut(offset..offset + row.len()) {
                dst.copy_from_slice(&row);
            }
        }
    }

    /// Anonymous-memory surface for tests; same geometry rules, no device.
    #[cfg(test)]
    pub(crate) fn offscreen(width: i32, height: i32) -> Self {
        let line_length = width as usize * 4;
        Self {
            map: MmapMut::map_anon(line_length * height as usize).expect("anonymous mapping"),
            width,
            height,
            bytes_per_pixel: 4,
            line_length,
        }
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: i32, y: i32) -> u32 {
        let offset = y as usize * self.line_length + x as usize * self.bytes_per_pixel;
        u32::from_le_bytes(self.map[offset..offset + 4].try_into().unwrap())
    }
}
