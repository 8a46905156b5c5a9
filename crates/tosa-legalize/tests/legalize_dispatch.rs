use tosa_legalize::legalize::{GELU, RSQRT, SIGMOID};
use tosa_legalize::table::INT8_TABLE_LEN;
use tosa_legalize::{
    is_activation_supported, legalize_activation, legalizer_for, ActivationDescriptor,
    AtomicIdSource, DataType, FunctionKind, FunctionTag, LegalizeError, LegalizeOptions, Lowering,
    NativeOp, Opcode, QuantizationParams, Shape, TargetDType, TensorDescriptor, UniqueIdSource,
};

fn descriptor(tag: FunctionTag) -> ActivationDescriptor {
    match tag {
        FunctionTag::Gelu => ActivationDescriptor::new(FunctionKind::Gelu),
        FunctionTag::Sigmoid => ActivationDescriptor::new(FunctionKind::Sigmoid),
        FunctionTag::TanH => ActivationDescriptor::tanh(1.0, 1.0),
        FunctionTag::Log => ActivationDescriptor::new(FunctionKind::Log),
        FunctionTag::Rsqrt => ActivationDescriptor::new(FunctionKind::Rsqrt),
    }
}

fn tensor(dtype: DataType) -> TensorDescriptor {
    let shape = Shape::new(vec![1, 2, 2, 3]);
    if dtype.is_quantized() {
        TensorDescriptor::quantized(dtype, shape, QuantizationParams::new(0.0625, 0))
    } else {
        TensorDescriptor::new(dtype, shape)
    }
}

fn lower(tag: FunctionTag, dtype: DataType) -> Result<tosa_legalize::BasicBlock, LegalizeError> {
    let ids = AtomicIdSource::new();
    legalize_activation(
        None,
        &descriptor(tag),
        &[tensor(dtype)],
        &[tensor(dtype)],
        &ids,
        &LegalizeOptions::default(),
    )
}

#[test]
fn int8_lowers_every_function_to_a_table() {
    for tag in FunctionTag::ALL {
        for dtype in [DataType::Int8Asymm, DataType::Int8Symm] {
            let block = lower(tag, dtype).unwrap_or_else(|err| panic!("{tag} {dtype}: {err}"));
            assert_eq!(block.operators.len(), 1);
            let op = &block.operators[0];
            assert_eq!(op.opcode, Opcode::Table);
            let table = op.attribute.as_ref().expect("table attribute");
            assert_eq!(table.as_int8().map(<[i8]>::len), Some(INT8_TABLE_LEN));
            assert_eq!(block.outputs.len(), 1);
            assert_eq!(block.tensor(&block.outputs[0]).unwrap().dtype, TargetDType::Int8);
        }
    }
}

#[test]
fn float_sigmoid_and_rsqrt_lower_natively() {
    for (tag, native) in [
        (FunctionTag::Sigmoid, NativeOp::Sigmoid),
        (FunctionTag::Rsqrt, NativeOp::Rsqrt),
    ] {
        for dtype in [DataType::Float32, DataType::Float16] {
            let block = lower(tag, dtype).expect("native lowering");
            assert_eq!(block.operators.len(), 1);
            assert_eq!(block.operators[0].opcode, Opcode::Native(native));
            assert!(block.operators[0].attribute.is_none());
        }
    }
}

#[test]
fn float_gelu_log_tanh_are_not_implemented() {
    for tag in [FunctionTag::Gelu, FunctionTag::Log, FunctionTag::TanH] {
        for dtype in [DataType::Float32, DataType::Float16] {
            let err = lower(tag, dtype).expect_err("float lowering is disabled");
            assert!(
                matches!(err, LegalizeError::NotYetImplemented { dtype: d, .. } if d == dtype),
                "{tag} {dtype}: {err}"
            );
        }
    }
}

#[test]
fn int16_tables_stay_disabled() {
    for tag in [FunctionTag::Gelu, FunctionTag::Sigmoid, FunctionTag::TanH] {
        assert_eq!(legalizer_for(tag).lowering(DataType::Int16Symm), Lowering::Table16);
        let err = lower(tag, DataType::Int16Symm).expect_err("int16 tables are disabled");
        assert!(matches!(err, LegalizeError::NotYetImplemented { .. }), "{err}");
    }
    for tag in [FunctionTag::Log, FunctionTag::Rsqrt] {
        let err = lower(tag, DataType::Int16Symm).expect_err("no int16 lowering");
        assert!(matches!(err, LegalizeError::UnsupportedType { .. }), "{err}");
    }
}

#[test]
fn wide_integers_are_unsupported() {
    for tag in FunctionTag::ALL {
        for dtype in [DataType::Int32, DataType::Int64] {
            let err = lower(tag, dtype).expect_err("wide integers are unsupported");
            assert!(
                matches!(err, LegalizeError::UnsupportedType { dtype: d, .. } if d == dtype),
                "{tag} {dtype}: {err}"
            );
        }
    }
}

#[test]
fn unsupported_message_names_type_and_supported_list() {
    let err = lower(FunctionTag::Rsqrt, DataType::Int16Symm).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("QSymmS16"), "{message}");
    assert!(
        message.contains("Float32, Float16, QAsymmS8, QSymmS8"),
        "{message}"
    );

    let err = lower(FunctionTag::Gelu, DataType::Float32).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not implemented yet"), "{message}");
    assert!(message.contains("Float32"), "{message}");
    assert!(message.contains("QAsymmS8, QSymmS8"), "{message}");
}

#[test]
fn supported_types_follow_capability_tables() {
    assert_eq!(
        GELU.supported_types(),
        vec![DataType::Int8Asymm, DataType::Int8Symm]
    );
    assert_eq!(
        SIGMOID.supported_types(),
        vec![
            DataType::Float32,
            DataType::Float16,
            DataType::Int8Asymm,
            DataType::Int8Symm
        ]
    );
    assert_eq!(RSQRT.supported_types(), SIGMOID.supported_types());
    for tag in FunctionTag::ALL {
        assert_eq!(legalizer_for(tag).tag(), tag);
    }
}

#[test]
fn wrong_arity_is_an_argument_error() {
    let ids = AtomicIdSource::new();
    let input = tensor(DataType::Int8Asymm);
    let options = LegalizeOptions::default();
    let desc = descriptor(FunctionTag::Sigmoid);

    let cases: [(&[TensorDescriptor], &[TensorDescriptor]); 4] = [
        (&[], std::slice::from_ref(&input)),
        (&[input.clone(), input.clone()], std::slice::from_ref(&input)),
        (std::slice::from_ref(&input), &[]),
        (std::slice::from_ref(&input), &[input.clone(), input.clone()]),
    ];
    for (inputs, outputs) in cases {
        let err = SIGMOID
            .legalize(None, &desc, inputs, outputs, &ids, &options)
            .expect_err("arity must be checked");
        assert!(err.is_argument(), "{err}");
    }
    // failed calls do not consume block tokens
    assert_eq!(ids.next_id(), "1");
}

#[test]
fn mismatched_function_is_an_argument_error() {
    let ids = AtomicIdSource::new();
    let input = tensor(DataType::Int8Asymm);
    let err = GELU
        .legalize(
            None,
            &descriptor(FunctionTag::Sigmoid),
            std::slice::from_ref(&input),
            std::slice::from_ref(&input),
            &ids,
            &LegalizeOptions::default(),
        )
        .expect_err("descriptor mismatch");
    assert!(err.is_argument(), "{err}");
    assert!(err.to_string().contains("SIGMOID"), "{err}");
}

#[test]
fn int8_requires_valid_quantization() {
    let ids = AtomicIdSource::new();
    let options = LegalizeOptions::default();
    let desc = descriptor(FunctionTag::Log);
    let quantized = tensor(DataType::Int8Symm);
    let bare = TensorDescriptor::new(DataType::Int8Symm, Shape::new(vec![4]));
    let zero_scale = TensorDescriptor::quantized(
        DataType::Int8Symm,
        Shape::new(vec![4]),
        QuantizationParams::new(0.0, 0),
    );

    for (input, output) in [
        (&bare, &quantized),
        (&quantized, &bare),
        (&zero_scale, &quantized),
    ] {
        let err = legalize_activation(
            None,
            &desc,
            std::slice::from_ref(input),
            std::slice::from_ref(output),
            &ids,
            &options,
        )
        .expect_err("quantization is required");
        assert!(err.is_argument(), "{err}");
    }
}

#[test]
fn output_type_must_match_the_strategy() {
    let ids = AtomicIdSource::new();
    let options = LegalizeOptions::default();

    let err = legalize_activation(
        None,
        &descriptor(FunctionTag::Sigmoid),
        &[tensor(DataType::Int8Asymm)],
        &[tensor(DataType::Float32)],
        &ids,
        &options,
    )
    .expect_err("table output must be int8");
    assert!(err.is_argument(), "{err}");

    let err = legalize_activation(
        None,
        &descriptor(FunctionTag::Rsqrt),
        &[tensor(DataType::Float32)],
        &[tensor(DataType::Int32)],
        &ids,
        &options,
    )
    .expect_err("native output must be float");
    assert!(err.is_argument(), "{err}");
}

#[test]
fn standalone_block_declares_sentinels() {
    let ids = AtomicIdSource::new();
    let block = legalize_activation(
        None,
        &descriptor(FunctionTag::Sigmoid),
        &[tensor(DataType::Float32)],
        &[tensor(DataType::Float32)],
        &ids,
        &LegalizeOptions::default().with_region("encoder"),
    )
    .expect("sigmoid lowers natively");

    assert_eq!(block.name, "Op_SIGMOID_block_1");
    assert_eq!(block.region, "encoder");
    assert_eq!(block.inputs, vec!["input_".to_string()]);
    assert_eq!(block.outputs, vec!["output0_".to_string()]);
    assert_eq!(block.tensors.len(), 2);
    let input = block.tensor("input_").expect("input declared");
    assert_eq!(input.dtype, TargetDType::Fp32);
    assert_eq!(input.shape.dims(), &[1, 2, 2, 3]);
    assert_eq!(block.operators[0].inputs, vec!["input_".to_string()]);
    assert_eq!(block.operators[0].outputs, vec!["output0_".to_string()]);
}

#[test]
fn support_probe_matches_legalization() {
    for tag in FunctionTag::ALL {
        for dtype in DataType::ALL {
            let probe = is_activation_supported(&descriptor(tag), &tensor(dtype), &tensor(dtype));
            assert_eq!(probe.is_ok(), lower(tag, dtype).is_ok(), "{tag} {dtype}");
            if let Err(err) = probe {
                assert!(err.is_unsupported(), "{tag} {dtype}: {err}");
            }
        }
    }
}
