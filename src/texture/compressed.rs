//! Compressed texture container sniffing and mip-chain parsing (spec §6):
//! PVR (`0x03525650` LE), ASTC (`0x5CA1AB13`), KTX (12-byte identifier).

use crate::error::{CoreError, CoreResult};

const PVR_MAGIC: u32 = 0x0352_5650;
const ASTC_MAGIC: u32 = 0x5CA1_AB13;
const KTX_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Pvr,
    Astc,
    Ktx,
}

impl ContainerFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Pvr => "pvr",
            ContainerFormat::Astc => "astc",
            ContainerFormat::Ktx => "ktx",
        }
    }
}

/// One mip level's byte range within the container, already aligned to the
/// required 4-byte boundary between images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    pub offset: usize,
    pub length: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressedTexture {
    pub format: ContainerFormat,
    pub width: u32,
    pub height: u32,
    pub mips: Vec<MipLevel>,
    pub total_bytes: u64,
}

pub fn sniff_format(bytes: &[u8]) -> CoreResult<ContainerFormat> {
    if bytes.len() >= 12 && bytes[0..12] == KTX_IDENTIFIER {
        return Ok(ContainerFormat::Ktx);
    }
    if bytes.len() >= 4 {
        let le = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if le == PVR_MAGIC {
            return Ok(ContainerFormat::Pvr);
        }
        let be = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        if be == ASTC_MAGIC {
            return Ok(ContainerFormat::Astc);
        }
    }
    Err(CoreError::TextureLoad {
        kind: crate::error::TextureLoadErrorKind::Format,
        message: "unrecognized compressed container magic bytes".into(),
    })
}

/// Parses just enough of each container to hand the batcher a mip chain:
/// full block-format decoding is left to the GPU (these formats upload
/// directly via `compressedUploadTexture`).
pub fn parse(bytes: &[u8]) -> CoreResult<CompressedTexture> {
    match sniff_format(bytes)? {
        ContainerFormat::Pvr => parse_pvr(bytes),
        ContainerFormat::Astc => parse_astc(bytes),
        ContainerFormat::Ktx => parse_ktx(bytes),
    }
}

fn align4(value: usize) -> usize {
    (value + 3) & !3
}

fn parse_pvr(bytes: &[u8]) -> CoreResult<CompressedTexture> {
    // PVRv3 header: 52 bytes, fields little-endian.
    const HEADER_SIZE: usize = 52;
    if bytes.len() < HEADER_SIZE {
        return Err(fmt_err("PVR header truncated"));
    }
    let width = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
    let height = u32::from_le_bytes(bytes[24..28].try_into().unwrap());
    let mip_count = u32::from_le_bytes(bytes[28..32].try_into().unwrap()).max(1);
    let meta_size = u32::from_le_bytes(bytes[48..52].try_into().unwrap()) as usize;

    let mut offset = HEADER_SIZE + meta_size;
    let mut mips = Vec::new();
    let mut w = width;
    let mut h = height;
    for _ in 0..mip_count {
        let block_bytes = ((w as usize).max(1) * (h as usize).max(1)) / 2;
        let length = align4(block_bytes.max(1));
        if offset + length > bytes.len() {
            break;
        }
        mips.push(MipLevel {
            offset,
            length,
            width: w,
            height: h,
        });
        offset += length;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    let total_bytes = mips.iter().map(|m| m.length as u64).sum();
    Ok(CompressedTexture {
        format: ContainerFormat::Pvr,
        width,
        height,
        mips,
        total_bytes,
    })
}

fn parse_astc(bytes: &[u8]) -> CoreResult<CompressedTexture> {
    const HEADER_SIZE: usize = 16;
    if bytes.len() < HEADER_SIZE {
        return Err(fmt_err("ASTC header truncated"));
    }
    let block_x = bytes[4] as u32;
    let block_y = bytes[5] as u32;
    let width = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], 0]);
    let height = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], 0]);
    let blocks_x = width.div_ceil(block_x.max(1));
    let blocks_y = height.div_ceil(block_y.max(1));
    let length = (blocks_x * blocks_y * 16) as usize;
    let data_len = bytes.len() - HEADER_SIZE;
    let length = length.min(data_len);
    Ok(CompressedTexture {
        format: ContainerFormat::Astc,
        width,
        height,
        mips: vec![MipLevel {
            offset: HEADER_SIZE,
            length,
            width,
            height,
        }],
        total_bytes: length as u64,
    })
}

fn parse_ktx(bytes: &[u8]) -> CoreResult<CompressedTexture> {
    const HEADER_SIZE: usize = 64;
    if bytes.len() < HEADER_SIZE {
        return Err(fmt_err("KTX header truncated"));
    }
    // Byte 12 is the endianness marker: 0x04030201 little-endian, swapped
    // if the file was written big-endian.
    let endian_le = bytes[12..16] == [0x01, 0x02, 0x03, 0x04];
    let read_u32 = |slice: &[u8]| -> u32 {
        let arr: [u8; 4] = slice.try_into().unwrap();
        if endian_le {
            u32::from_le_bytes(arr)
        } else {
            u32::from_be_bytes(arr)
        }
    };

    let width = read_u32(&bytes[36..40]).max(1);
    let height = read_u32(&bytes[40..44]).max(1);
    let mip_count = read_u32(&bytes[28..32]).max(1);
    let kvd_len = read_u32(&bytes[60..64]) as usize;

    let mut offset = HEADER_SIZE + kvd_len;
    let mut mips = Vec::new();
    let mut w = width;
    let mut h = height;
    for _ in 0..mip_count {
        if offset + 4 > bytes.len() {
            break;
        }
        let image_size = read_u32(&bytes[offset..offset + 4]) as usize;
        offset += 4;
        if offset + image_size > bytes.len() {
            break;
        }
        mips.push(MipLevel {
            offset,
            length: image_size,
            width: w,
            height: h,
        });
        offset += align4(image_size);
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    let total_bytes = mips.iter().map(|m| m.length as u64).sum();
    Ok(CompressedTexture {
        format: ContainerFormat::Ktx,
        width,
        height,
        mips,
        total_bytes,
    })
}

fn fmt_err(message: &str) -> CoreError {
    CoreError::TextureLoad {
        kind: crate::error::TextureLoadErrorKind::Format,
        message: message.to_string(),
    }
}
