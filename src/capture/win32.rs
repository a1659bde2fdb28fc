//! Win32 plumbing: window enumeration, positioning, GDI pixel capture and
//! window teardown for Packet Tracer.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::time::Duration;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    GetWindowDC, RedrawWindow, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, HBITMAP, HDC, RDW_ALLCHILDREN, RDW_FRAME, RDW_INVALIDATE, RDW_UPDATENOW,
    SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, FlashWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
    PostMessageW, PrintWindow, SetForegroundWindow, SetWindowPos, ShowWindow, UpdateWindow,
    HWND_TOP, PRINT_WINDOW_FLAGS, SWP_SHOWWINDOW, SW_RESTORE, WM_CLOSE,
};

use super::chain::{CaptureBackend, Rect};
use super::window::{classify_title, WindowDesc, WindowRole};
use crate::config::CaptureZone;

fn to_hwnd(handle: isize) -> HWND {
    HWND(handle as *mut core::ffi::c_void)
}

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buf: Vec<u16> = vec![0; (len + 1) as usize];
        GetWindowTextW(hwnd, &mut buf);
        OsString::from_wide(&buf[..len as usize])
            .to_string_lossy()
            .to_string()
    }
}

fn window_rect(hwnd: HWND) -> Result<Rect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect)? };
    Ok(Rect {
        x: rect.left,
        y: rect.top,
        width: rect.right - rect.left,
        height: rect.bottom - rect.top,
    })
}

/// Enumerates visible top-level windows and keeps every Packet Tracer one.
pub fn find_packet_tracer_windows() -> Result<Vec<WindowDesc>> {
    struct EnumData {
        found: Vec<WindowDesc>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let title = window_title(hwnd);
            if title.is_empty() {
                return TRUE;
            }

            if let Some(role) = classify_title(&title) {
                if let Ok(rect) = window_rect(hwnd) {
                    data.found.push(WindowDesc {
                        handle: hwnd.0 as isize,
                        title,
                        rect,
                        role,
                    });
                }
            }

            TRUE
        }
    }

    let mut data = EnumData { found: Vec::new() };
    unsafe {
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
    }
    Ok(data.found)
}

/// Moves a window into the capture zone, forces a repaint, and verifies the
/// final position. The sleeps give Qt time to process each request.
pub fn position_window(handle: isize, zone: &CaptureZone) -> Result<Rect> {
    let hwnd = to_hwnd(handle);
    unsafe {
        let _ = ShowWindow(hwnd, SW_RESTORE);
        std::thread::sleep(Duration::from_millis(100));

        SetWindowPos(
            hwnd,
            HWND_TOP,
            zone.x,
            zone.y,
            zone.width,
            zone.height,
            SWP_SHOWWINDOW,
        )?;
        std::thread::sleep(Duration::from_millis(200));

        let _ = SetForegroundWindow(hwnd);
        std::thread::sleep(Duration::from_millis(100));

        let _ = UpdateWindow(hwnd);
        let _ = RedrawWindow(
            hwnd,
            None,
            None,
            RDW_INVALIDATE | RDW_UPDATENOW | RDW_ALLCHILDREN | RDW_FRAME,
        );
        std::thread::sleep(Duration::from_millis(300));
    }

    let rect = window_rect(hwnd)?;
    crate::log(&format!(
        "Window positioned at ({}, {}) size {}x{}",
        rect.x, rect.y, rect.width, rect.height
    ));
    Ok(rect)
}

/// Posts WM_CLOSE to every Packet Tracer window. Returns how many were told
/// to close.
pub fn close_packet_tracer_windows() -> usize {
    let windows = find_packet_tracer_windows().unwrap_or_default();
    let mut closed = 0;
    for desc in &windows {
        unsafe {
            let result = PostMessageW(to_hwnd(desc.handle), WM_CLOSE, WPARAM(0), LPARAM(0));
            if result.is_ok() {
                closed += 1;
                crate::log(&format!("Sent close to window: \"{}\"", desc.title));
            }
        }
    }
    closed
}

/// GDI pixel source for one window.
pub struct GdiBackend {
    hwnd: HWND,
}

impl GdiBackend {
    pub fn new(desc: &WindowDesc) -> Self {
        debug_assert_eq!(desc.role, WindowRole::Activity);
        Self {
            hwnd: to_hwnd(desc.handle),
        }
    }
}

/// Reads a 32bpp bitmap out of a memory DC into an RGB image.
///
/// The negative height asks for a top-down DIB; rows come out in image order.
fn read_bitmap(mem_dc: HDC, bitmap: HBITMAP, width: i32, height: i32) -> Result<RgbImage> {
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut pixels: Vec<u8> = vec![0; (width as usize) * (height as usize) * 4];
    let lines = unsafe {
        GetDIBits(
            mem_dc,
            bitmap,
            0,
            height as u32,
            Some(pixels.as_mut_ptr() as *mut _),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines == 0 {
        return Err(anyhow!("GetDIBits returned no scan lines"));
    }

    let mut img = RgbImage::new(width as u32, height as u32);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let offset = i * 4;
        // BGRX -> RGB
        pixel.0 = [pixels[offset + 2], pixels[offset + 1], pixels[offset]];
    }
    Ok(img)
}

impl CaptureBackend for GdiBackend {
    fn grab_screen(&mut self, rect: Rect) -> Result<RgbImage> {
        if rect.width <= 0 || rect.height <= 0 {
            return Err(anyhow!("Degenerate capture rectangle: {:?}", rect));
        }
        unsafe {
            let screen_dc = GetDC(None);
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, rect.width, rect.height);
            let old = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(
                mem_dc,
                0,
                0,
                rect.width,
                rect.height,
                screen_dc,
                rect.x,
                rect.y,
                SRCCOPY,
            );
            SelectObject(mem_dc, old);

            let result = match blit {
                Ok(()) => read_bitmap(mem_dc, bitmap, rect.width, rect.height),
                Err(e) => Err(anyhow!("BitBlt failed: {}", e)),
            };

            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);
            result
        }
    }

    fn render_window(&mut self, flag: u32) -> Result<RgbImage> {
        let rect = window_rect(self.hwnd)?;
        if rect.width <= 0 || rect.height <= 0 {
            return Err(anyhow!("Window has no area"));
        }
        unsafe {
            let window_dc = GetWindowDC(self.hwnd);
            let mem_dc = CreateCompatibleDC(window_dc);
            let bitmap = CreateCompatibleBitmap(window_dc, rect.width, rect.height);
            let old = SelectObject(mem_dc, bitmap);

            let rendered = PrintWindow(self.hwnd, mem_dc, PRINT_WINDOW_FLAGS(flag)).as_bool();
            SelectObject(mem_dc, old);

            let result = if rendered {
                read_bitmap(mem_dc, bitmap, rect.width, rect.height)
            } else {
                Err(anyhow!("PrintWindow refused flag {}", flag))
            };

            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(self.hwnd, window_dc);
            result
        }
    }

    fn flash_window(&mut self) -> Result<()> {
        unsafe {
            let _ = FlashWindow(self.hwnd, true);
        }
        std::thread::sleep(Duration::from_millis(200));
        Ok(())
    }
}
