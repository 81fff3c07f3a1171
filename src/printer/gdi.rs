//! Windows GDI spooler

use super::{DeviceContext, PrintError, PrintSpooler};
use image::DynamicImage;
use std::ffi::c_void;
use std::iter::once;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateDCW, DIB_RGB_COLORS, DeleteDC, HDC, SRCCOPY,
    StretchDIBits,
};
use windows::Win32::Graphics::Printing::{
    EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_4W,
};
use windows::Win32::Storage::Xps::{DOCINFOW, EndDoc, EndPage, StartDocW, StartPage};
use windows::core::{PCWSTR, w};

pub struct GdiSpooler;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

impl PrintSpooler for GdiSpooler {
    fn printers(&self) -> Result<Vec<String>, PrintError> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed = 0u32;
        let mut returned = 0u32;

        // Sizing call; fails with ERROR_INSUFFICIENT_BUFFER when printers exist.
        unsafe {
            let _ = EnumPrintersW(flags, PCWSTR::null(), 4, None, &mut needed, &mut returned);
        }
        if needed == 0 {
            return Ok(Vec::new());
        }

        // u64 storage keeps the PRINTER_INFO_4W records pointer-aligned.
        let mut storage = vec![0u64; (needed as usize).div_ceil(8)];
        let buffer = unsafe {
            std::slice::from_raw_parts_mut(storage.as_mut_ptr().cast::<u8>(), needed as usize)
        };
        unsafe {
            EnumPrintersW(
                flags,
                PCWSTR::null(),
                4,
                Some(buffer),
                &mut needed,
                &mut returned,
            )
        }
        .map_err(|e| PrintError::Enumerate(e.message().to_string()))?;

        let infos = unsafe {
            std::slice::from_raw_parts(
                storage.as_ptr().cast::<PRINTER_INFO_4W>(),
                returned as usize,
            )
        };

        Ok(infos
            .iter()
            .filter_map(|info| unsafe { info.pPrinterName.to_string() }.ok())
            .collect())
    }

    fn open(&self, printer: &str) -> Result<Box<dyn DeviceContext>, PrintError> {
        let name = wide(printer);
        let hdc = unsafe { CreateDCW(w!("WINSPOOL"), PCWSTR(name.as_ptr()), PCWSTR::null(), None) };
        if hdc.is_invalid() {
            return Err(PrintError::Open(printer.to_string()));
        }
        tracing::debug!("Opened device context for '{}'", printer);
        Ok(Box::new(GdiContext { hdc }))
    }
}

/// Printer device context; deleted on drop
struct GdiContext {
    hdc: HDC,
}

fn check(call: &'static str, ret: i32) -> Result<(), PrintError> {
    if ret <= 0 {
        tracing::warn!("{} returned {}", call, ret);
        return Err(PrintError::Device { call });
    }
    Ok(())
}

impl DeviceContext for GdiContext {
    fn start_doc(&mut self, title: &str) -> Result<(), PrintError> {
        let title = wide(title);
        let info = DOCINFOW {
            cbSize: std::mem::size_of::<DOCINFOW>() as i32,
            lpszDocName: PCWSTR(title.as_ptr()),
            lpszOutput: PCWSTR::null(),
            lpszDatatype: PCWSTR::null(),
            fwType: 0,
        };
        check("StartDoc", unsafe { StartDocW(self.hdc, &info) })
    }

    fn start_page(&mut self) -> Result<(), PrintError> {
        check("StartPage", unsafe { StartPage(self.hdc) })
    }

    fn draw_image(&mut self, image: &DynamicImage, x: i32, y: i32) -> Result<(), PrintError> {
        let rgba = image.to_rgba8();
        let (width, height) = (rgba.width() as i32, rgba.height() as i32);

        // GDI wants 32bpp BGRA rows.
        let mut bgra = rgba.into_raw();
        for px in bgra.chunks_exact_mut(4) {
            px.swap(0, 2);
        }

        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // negative height: top-down rows
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = unsafe {
            StretchDIBits(
                self.hdc,
                x,
                y,
                width,
                height,
                0,
                0,
                width,
                height,
                Some(bgra.as_ptr().cast::<c_void>()),
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            )
        };
        check("StretchDIBits", lines)
    }

    fn end_page(&mut self) -> Result<(), PrintError> {
        check("EndPage", unsafe { EndPage(self.hdc) })
    }

    fn end_doc(&mut self) -> Result<(), PrintError> {
        check("EndDoc", unsafe { EndDoc(self.hdc) })
    }
}

impl Drop for GdiContext {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.hdc);
        }
    }
}
