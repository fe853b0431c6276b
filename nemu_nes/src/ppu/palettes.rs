/// NES color index -> packed 0x00RRGGBB. One of several reasonable
/// digitizations of the 2C02's composite output.
#[rustfmt::skip]
pub const NES_PALETTE: [u32; 64] = [
    0x525252, 0x011a51, 0x0f0f65, 0x230663, 0x36034b, 0x400426, 0x3f0904, 0x321300,
    0x1f2000, 0x0b2a00, 0x002f00, 0x002e0a, 0x00262d, 0x000000, 0x000000, 0x000000,
    0xa0a0a0, 0x1e4a9d, 0x3837bc, 0x5828b8, 0x752194, 0x84235c, 0x822e24, 0x6f3f00,
    0x515200, 0x316300, 0x1a6b05, 0x0e692e, 0x105c68, 0x000000, 0x000000, 0x000000,
    0xfeffff, 0x699efc, 0x8987ff, 0xae76ff, 0xce6df1, 0xe070b2, 0xde7c70, 0xc8913e,
    0xa6a725, 0x81ba28, 0x63c446, 0x54c17d, 0x56b3c0, 0x3c3c3c, 0x000000, 0x000000,
    0xfeffff, 0xbed6fd, 0xccccff, 0xddc4ff, 0xeac0f9, 0xf2c1df, 0xf1c7c2, 0xe8d0aa,
    0xd9da9d, 0xc9e29e, 0xbce6ae, 0xb4e5c7, 0xb5dfe4, 0xa9a9a9, 0x000000, 0x000000,
];
