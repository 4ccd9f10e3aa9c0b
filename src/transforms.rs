bitflags::bitflags! {
  /// A set of enabled row transformations.
  ///
  /// The set is fixed once a pipeline is built. The order stages run in is set
  /// by the pipeline, not by the order flags were added.
  #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
  pub struct Transforms: u32 {
    /// Flip RGB to BGR, RGBA to BGRA.
    const BGR = 1 << 0;
    /// Unpack 1, 2 and 4 bit samples to a byte each.
    const PACK = 1 << 2;
    /// Shift samples down to their significant bits.
    const SHIFT = 1 << 3;
    /// Little-endian 16-bit samples.
    const SWAP_BYTES = 1 << 4;
    /// Invert 1-bit gray.
    const INVERT_MONO = 1 << 5;
    /// Reduce to a palette.
    const DITHER = 1 << 6;
    /// Composite against a background color.
    const BACKGROUND = 1 << 7;
    /// The background color is given at the expanded depth.
    const BACKGROUND_EXPAND = 1 << 8;
    /// Undo the MNG intrapixel differencing.
    const INTRAPIXEL = 1 << 9;
    /// Reduce 16-bit samples to 8 bits.
    const STRIP_16 = 1 << 10;
    /// Drop the alpha channel.
    const STRIP_ALPHA = 1 << 11;
    /// Expand palettes, low gray depths and tRNS.
    const EXPAND = 1 << 13;
    /// Gamma correct samples.
    const GAMMA = 1 << 14;
    /// Copy gray to RGB.
    const GRAY_TO_RGB = 1 << 15;
    /// Add a filler channel.
    const FILLER = 1 << 16;
    /// Swap the order of packed pixels within a byte.
    const PACKSWAP = 1 << 17;
    /// Move alpha before the color channels.
    const SWAP_ALPHA = 1 << 18;
    /// Invert the alpha channel.
    const INVERT_ALPHA = 1 << 19;
    /// Run the caller's callback last.
    const USER_TRANSFORM = 1 << 20;
    /// Reduce RGB to gray.
    const RGB_TO_GRAY = 1 << 21;
  }
}

#[test]
fn test_transforms_set_ops() {
  let t = Transforms::EXPAND | Transforms::GAMMA;
  assert_eq!(format!("{t:?}"), "Transforms(EXPAND | GAMMA)");
  assert!(Transforms::default().is_empty());
  assert!(t.contains(Transforms::GAMMA));
  assert!(!t.contains(Transforms::GAMMA | Transforms::BGR));
  assert!(t.intersects(Transforms::GAMMA | Transforms::BGR));
  let mut u = t;
  u.remove(Transforms::GAMMA);
  assert_eq!(u, Transforms::EXPAND);
}
