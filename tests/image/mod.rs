mod tiff_roundtrip_test;
