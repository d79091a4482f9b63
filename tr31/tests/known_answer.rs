use hex_literal::hex;
use tr31::{Header, KeyBlock, KeyBlockError, Version};


struct Vector {
    kbpk: Vec<u8>,
    key: Vec<u8>,
    key_block: String,
    masked_key_len: Option<usize>,
}

fn vectors() -> Vec<Vector> {
    vec![
        // variant, double DES
        Vector {
            kbpk: hex!("AAAAAAAAAAAAAAAABBBBBBBBBBBBBBBB").to_vec(),
            key: hex!("EEEEEEEEEEEEEEEE").to_vec(),
            key_block: "A0088M3TC00E000062C2C14D8785A01A9E8283525CA96F490D0CC6346FC7C2AC1E6FF354468910379AA5BBA6".to_owned(),
            masked_key_len: None,
        },
        // variant, single DES
        Vector {
            kbpk: hex!("0123456789ABCDEF").to_vec(),
            key: hex!("FEDCBA9876543210").to_vec(),
            key_block: "A0056D0D000E00006C343131E5A5655283513221EB6457B64376B82B".to_owned(),
            masked_key_len: Some(8),
        },
        // CMAC, double DES
        Vector {
            kbpk: hex!("89E88CF7931444F334BD7547FC3F380C").to_vec(),
            key: hex!("F039121BEC83D26B169BDCD5B22AAF8F").to_vec(),
            key_block: "B0080P0TE00E0000b26517653e5a8081c70c2cd8b691bf6e90097d9fbd8df2dd07024e23cd5f9f2d".to_owned(),
            masked_key_len: Some(16),
        },
        // CMAC, triple DES, extended block length
        Vector {
            kbpk: hex!("1D22BF32387C600AD97F9B97A51311AC1D22BF32387C600A").to_vec(),
            key: hex!("0123456789ABCDEF").to_vec(),
            key_block: format!(
                "B0384M3TC00E0200KP00020136{}PB0A000000{}",
                "X".repeat(300),
                "8f3d5c617e21d0f777aceaeb5829e2349b3375408c1d91d8",
            ),
            masked_key_len: Some(8),
        },
        // variant, version C
        Vector {
            kbpk: hex!("B8ED59E0A279A295E9F5ED7944FD06B9").to_vec(),
            key: hex!("EDB380DD340BC2620247D445F5B8D678").to_vec(),
            key_block: "C0072D0TB00E0000003177EC0C28D126114676B5D2A95174A9A9FE34DAFBCA51F6582AE3".to_owned(),
            masked_key_len: None,
        },
        // CMAC, AES-256
        Vector {
            kbpk: hex!("88E1AB2A2E3DD38C1FA039A536500CC8A87AB9D62DC92C01058FA79F44657DE6").to_vec(),
            key: hex!("3F419E1CB7079442AA37474C2EFBF8B8").to_vec(),
            key_block: "D0112P0AE00E00009daed3b3a7b6a945320398783d7bfc3ade302882444d44214f7d738e67f39b37febb45ec9be708b9f2cd7964b84f568e".to_owned(),
            masked_key_len: Some(16),
        },
        // CMAC, AES-128, with blocks
        Vector {
            kbpk: hex!("4ABFAB6AD3C2E8D0E2BB2B3E6F1D3F2C").to_vec(),
            key: hex!("BBA4596F1CE4DD55E8BA5F1C1F1D5E8A0123456789ABCDEF0123456789ABCDEF").to_vec(),
            key_block: "D0160K0AB00N0200KS0C1234ABCDPB04e311a41871c6b5df62b9fcfa7f5e2d76125664a96dd4fd846924082c502c104571be16bd4dabac1e5096615b150199e0de3032d5a5c06357f5a6001825fa0ad3".to_owned(),
            masked_key_len: None,
        },
    ]
}


#[test]
fn test_unwrap_vectors() {
    for vector in vectors() {
        let key_block = KeyBlock::new(&vector.kbpk, Header::default());
        let unwrapped = key_block.unwrap(&vector.key_block)
            .unwrap_or_else(|e| panic!("failed to unwrap {}: {}", vector.key_block, e));
        assert_eq!(unwrapped.key.as_slice(), vector.key.as_slice(), "{}", vector.key_block);
    }
}

#[test]
fn test_wrap_reproduces_layout() {
    // the random padding differs, but header and length must match exactly
    for vector in vectors() {
        let (header, header_len) = Header::parse(&vector.key_block).unwrap();
        let key_block = KeyBlock::new(&vector.kbpk, header);
        let wrapped = key_block.wrap(&vector.key, vector.masked_key_len).unwrap();

        assert_eq!(wrapped.len(), vector.key_block.len(), "{}", vector.key_block);
        assert_eq!(&wrapped[..header_len], &vector.key_block[..header_len]);
        assert_eq!(key_block.unwrap(&wrapped).unwrap().key.as_slice(), vector.key.as_slice());
    }
}

#[test]
fn test_unwrapped_headers() {
    let vectors = vectors();

    let extended = KeyBlock::new(&vectors[3].kbpk, Header::default())
        .unwrap(&vectors[3].key_block)
        .unwrap();
    assert_eq!(extended.header.version_id(), Version::B);
    assert_eq!(extended.header.blocks().len(), 1);
    assert_eq!(extended.header.blocks().get("KP"), Some("X".repeat(300).as_str()));

    let with_blocks = KeyBlock::new(&vectors[6].kbpk, Header::default())
        .unwrap(&vectors[6].key_block)
        .unwrap();
    assert_eq!(with_blocks.header.version_id(), Version::D);
    assert_eq!(with_blocks.header.key_usage(), "K0");
    assert_eq!(with_blocks.header.mode_of_use(), "B");
    assert_eq!(with_blocks.header.exportability(), "N");
    let blocks: Vec<(&str, &str)> = with_blocks.header.blocks().iter().collect();
    assert_eq!(blocks, [("KS", "1234ABCD")]);
}

#[test]
fn test_length_mismatch() {
    let vectors = vectors();
    let vector = &vectors[0];
    let key_block = KeyBlock::new(&vector.kbpk, Header::default());

    let extended = format!("{}00", vector.key_block);
    assert!(matches!(
        key_block.unwrap(&extended),
        Err(KeyBlockError::LengthMismatch { declared: 88, actual: 90 }),
    ));

    let misdeclared = vector.key_block.replacen("A0088", "A0087", 1);
    assert!(matches!(
        key_block.unwrap(&misdeclared),
        Err(KeyBlockError::LengthMismatch { declared: 87, actual: 88 }),
    ));
}

#[test]
fn test_wrong_kbpk() {
    for vector in vectors() {
        let mut kbpk = vector.kbpk.clone();
        kbpk[0] ^= 0x02;
        let key_block = KeyBlock::new(&kbpk, Header::default());
        assert!(
            matches!(key_block.unwrap(&vector.key_block), Err(KeyBlockError::MacMismatch)),
            "{}", vector.key_block,
        );
    }
}
